//! Types and the post-order annotation pass.
//!
//! Types are a tiny recursive value: `int` or a pointer chain ending in
//! `int`, compared structurally. The annotation pass walks every function
//! body bottom-up, fills in each expression's type exactly once, and
//! rewrites pointer-involving additions into canonical pointer-left form
//! so the code generator never has to look at types again.
//!
//! Pointer arithmetic is deliberately unscaled: `p + 1` advances the
//! pointer by one storage unit, not by the pointee width.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::parser::{BinaryOp, Expr, ExprKind, Function, LocalVariable, Stmt, StmtKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
  Int,
  Ptr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
  pub kind: TypeKind,
  pub base: Option<Box<Type>>,
}

impl Type {
  pub fn int() -> Self {
    Self {
      kind: TypeKind::Int,
      base: None,
    }
  }

  pub fn pointer_to(base: Type) -> Self {
    Self {
      kind: TypeKind::Ptr,
      base: Some(Box::new(base)),
    }
  }

  pub fn is_pointer(&self) -> bool {
    matches!(self.kind, TypeKind::Ptr)
  }

  pub fn base(&self) -> Option<&Type> {
    self.base.as_deref()
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      TypeKind::Int => write!(f, "int"),
      TypeKind::Ptr => match self.base() {
        Some(base) => write!(f, "{base}*"),
        None => write!(f, "*"),
      },
    }
  }
}

/// Annotate every expression in the program with its type, in place.
///
/// The pass is a pure function of tree structure: running it a second
/// time on an already-annotated program yields identical assignments.
pub fn annotate(program: &mut [Function], source: &str) -> CompileResult<()> {
  for func in program.iter_mut() {
    let Function { body, locals, .. } = func;
    if let Some(body) = body.as_deref_mut() {
      annotate_stmt(body, locals, source)?;
    }
  }
  Ok(())
}

fn annotate_stmt(stmt: &mut Stmt, locals: &[LocalVariable], source: &str) -> CompileResult<()> {
  let mut cur = Some(stmt);
  while let Some(stmt) = cur {
    match &mut stmt.kind {
      StmtKind::Expr(expr) | StmtKind::Return(expr) => {
        annotate_expr(expr, locals, source)?;
      }
      StmtKind::If { cond, then, els } => {
        annotate_expr(cond, locals, source)?;
        annotate_stmt(then, locals, source)?;
        if let Some(els) = els {
          annotate_stmt(els, locals, source)?;
        }
      }
      StmtKind::While { cond, body } => {
        annotate_expr(cond, locals, source)?;
        annotate_stmt(body, locals, source)?;
      }
      StmtKind::For {
        init,
        cond,
        step,
        body,
      } => {
        for clause in [init, cond, step].into_iter().flatten() {
          annotate_expr(clause, locals, source)?;
        }
        annotate_stmt(body, locals, source)?;
      }
      StmtKind::Block { body } => {
        if let Some(body) = body {
          annotate_stmt(body, locals, source)?;
        }
      }
      StmtKind::Empty => {}
    }
    cur = stmt.next.as_deref_mut();
  }
  Ok(())
}

/// Post-order: operands first, then this node's type.
fn annotate_expr(expr: &mut Expr, locals: &[LocalVariable], source: &str) -> CompileResult<()> {
  let loc = expr.loc;
  match &mut expr.kind {
    ExprKind::Num { .. } => {
      expr.ty = Some(Type::int());
    }
    ExprKind::Var { obj } => {
      expr.ty = Some(locals[*obj].ty.clone());
    }
    ExprKind::FunCall { args, .. } => {
      for arg in args.iter_mut() {
        annotate_expr(arg, locals, source)?;
      }
      expr.ty = Some(Type::int());
    }
    ExprKind::Binary { op, lhs, rhs } => {
      annotate_expr(lhs, locals, source)?;
      annotate_expr(rhs, locals, source)?;
      match op {
        BinaryOp::Add => {
          // Canonical pointer-left form: a pointer on the right swaps to
          // the left; pointer + pointer has no meaning here.
          if rhs.ty.as_ref().is_some_and(Type::is_pointer) {
            std::mem::swap(lhs, rhs);
          }
          if rhs.ty.as_ref().is_some_and(Type::is_pointer) {
            return Err(CompileError::type_at(
              source,
              loc,
              "invalid pointer arithmetic operands",
            ));
          }
          expr.ty = lhs.ty.clone();
        }
        BinaryOp::Sub => {
          if rhs.ty.as_ref().is_some_and(Type::is_pointer) {
            return Err(CompileError::type_at(
              source,
              loc,
              "invalid pointer arithmetic operands",
            ));
          }
          expr.ty = lhs.ty.clone();
        }
        BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => {
          expr.ty = Some(Type::int());
        }
      }
    }
    ExprKind::Assign { lhs, rhs } => {
      annotate_expr(lhs, locals, source)?;
      annotate_expr(rhs, locals, source)?;
      expr.ty = lhs.ty.clone();
    }
    ExprKind::Addr { operand } => {
      annotate_expr(operand, locals, source)?;
      let base = operand.ty.clone().ok_or_else(|| {
        CompileError::type_at(source, loc, "internal error: operand missing type")
      })?;
      expr.ty = Some(Type::pointer_to(base));
    }
    ExprKind::Deref { operand } => {
      annotate_expr(operand, locals, source)?;
      let base = operand
        .ty
        .as_ref()
        .filter(|ty| ty.is_pointer())
        .and_then(Type::base);
      match base {
        Some(base) => expr.ty = Some(base.clone()),
        None => {
          return Err(CompileError::type_at(
            source,
            loc,
            "invalid pointer dereference",
          ));
        }
      }
    }
  }
  Ok(())
}
