//! Code generation: lower the typed AST into AArch64 assembly.
//!
//! The emitter uses a simple stack machine: every expression not in root
//! position pushes its one-word result, and every binary operator pops
//! its operands back into a fixed register pair. Correctness relies on
//! the LIFO push/pop discipline matching the AST's nesting, so no
//! register allocation is attempted. Pushes are 16 bytes wide to keep
//! `sp` aligned at all times. Locals live on the stack frame and are
//! addressed relative to `fp`.

use crate::error::{CompileError, CompileResult};
use crate::parser::{BinaryOp, Expr, ExprKind, Function, Stmt, StmtKind};

/// Argument registers in index order, per the calling convention.
const ARG_REGS: [&str; 6] = ["x0", "x1", "x2", "x3", "x4", "x5"];

/// Emit assembly for a whole program, one global symbol block per function.
pub fn generate(program: &[Function], source: &str) -> CompileResult<String> {
  let mut asm = String::new();
  for (i, func) in program.iter().enumerate() {
    if i > 0 {
      asm.push('\n');
    }
    let mut codegen = Codegen {
      func,
      source,
      asm: &mut asm,
      label_count: 0,
      depth: 0,
    };
    codegen.emit_function()?;
  }
  Ok(asm)
}

/// Per-function emission context: the label counter restarts for each
/// function and the depth counter tracks the operand-stack balance.
struct Codegen<'a> {
  func: &'a Function,
  source: &'a str,
  asm: &'a mut String,
  label_count: usize,
  depth: i64,
}

impl Codegen<'_> {
  fn emit_function(&mut self) -> CompileResult<()> {
    let name = &self.func.name;
    self.asm.push_str(&format!("\t.global _{name}\n"));
    self.asm.push_str(&format!("_{name}:\n"));

    self.emit("stp", "fp, lr, [sp, #-16]!", "prologue");
    self.emit("mov", "fp, sp", "");
    self.emit("sub", &format!("sp, sp, #{}", self.func.stack_size), "");

    for (i, &obj) in self.func.params.iter().enumerate() {
      let local = &self.func.locals[obj];
      self.emit(
        "str",
        &format!("{}, [fp, #-{}]", ARG_REGS[i], local.offset),
        &format!("store param '{}'", local.name),
      );
    }

    if let Some(body) = self.func.body.as_deref() {
      self.emit_stmt(body)?;
    }

    self.place_label(&self.epilogue_label());
    self.emit("mov", "sp, fp", "epilogue");
    self.emit("ldp", "fp, lr, [sp], #16", "");
    self.emit("ret", "", "");

    debug_assert_eq!(self.depth, 0, "operand stack out of balance");
    Ok(())
  }

  /// Walk the statement chain, emitting code for each entry.
  fn emit_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
    for stmt in stmt.iter() {
      match &stmt.kind {
        StmtKind::Expr(expr) => {
          // Root position: the value lands in x0 and is discarded.
          self.emit_expr(expr, true)?;
        }
        StmtKind::Return(expr) => {
          self.emit_expr(expr, true)?;
          self.emit("b", &self.epilogue_label(), "return");
        }
        StmtKind::If { cond, then, els } => {
          let c = self.next_label();
          self.emit_expr(cond, true)?;
          self.emit("cmp", "x0, #0", "condition");
          match els {
            Some(els) => {
              self.emit("beq", &self.control_label("else", c), "");
              self.emit_stmt(then)?;
              self.emit("b", &self.control_label("end", c), "");
              self.place_label(&self.control_label("else", c));
              self.emit_stmt(els)?;
            }
            None => {
              self.emit("beq", &self.control_label("end", c), "");
              self.emit_stmt(then)?;
            }
          }
          self.place_label(&self.control_label("end", c));
        }
        StmtKind::While { cond, body } => {
          let c = self.next_label();
          self.place_label(&self.control_label("begin", c));
          self.emit_expr(cond, true)?;
          self.emit("cmp", "x0, #0", "condition");
          self.emit("beq", &self.control_label("end", c), "");
          self.emit_stmt(body)?;
          self.emit("b", &self.control_label("begin", c), "");
          self.place_label(&self.control_label("end", c));
        }
        StmtKind::For {
          init,
          cond,
          step,
          body,
        } => {
          let c = self.next_label();
          if let Some(init) = init {
            self.emit_expr(init, true)?;
          }
          self.place_label(&self.control_label("begin", c));
          if let Some(cond) = cond {
            self.emit_expr(cond, true)?;
            self.emit("cmp", "x0, #0", "condition");
            self.emit("beq", &self.control_label("end", c), "");
          }
          self.emit_stmt(body)?;
          if let Some(step) = step {
            self.emit_expr(step, true)?;
          }
          self.emit("b", &self.control_label("begin", c), "");
          self.place_label(&self.control_label("end", c));
        }
        StmtKind::Block { body } => {
          if let Some(body) = body {
            self.emit_stmt(body)?;
          }
        }
        StmtKind::Empty => {}
      }
    }
    Ok(())
  }

  /// Emit stack-based code for a single expression node. The value ends
  /// up in `x0`; when not in root position it is also pushed.
  fn emit_expr(&mut self, expr: &Expr, is_root: bool) -> CompileResult<()> {
    match &expr.kind {
      ExprKind::Num { value } => {
        self.emit("mov", &format!("x0, #{value}"), "constant");
        if !is_root {
          self.push("x0", "push");
        }
      }
      ExprKind::Var { .. } => {
        self.emit_addr(expr)?;
        self.pop("x0", "pop address");
        self.emit("ldr", "x0, [x0]", "load value");
        if !is_root {
          self.push("x0", "push value");
        }
      }
      ExprKind::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs, false)?;
        self.emit_expr(rhs, false)?;
        self.pop("x1", "pop");
        self.pop("x0", "pop");
        match op {
          BinaryOp::Add => self.emit("add", "x0, x0, x1", ""),
          BinaryOp::Sub => self.emit("sub", "x0, x0, x1", ""),
          BinaryOp::Mul => self.emit("mul", "x0, x0, x1", ""),
          BinaryOp::Div => self.emit("sdiv", "x0, x0, x1", ""),
          BinaryOp::Eq => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, eq", "");
          }
          BinaryOp::Ne => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, ne", "");
          }
          BinaryOp::Lt => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, lt", "");
          }
          BinaryOp::Le => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, le", "");
          }
          BinaryOp::Gt => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, gt", "");
          }
          BinaryOp::Ge => {
            self.emit("cmp", "x0, x1", "");
            self.emit("cset", "w0, ge", "");
          }
        }
        if !is_root {
          self.push("x0", "push");
        }
      }
      ExprKind::Assign { lhs, rhs } => {
        self.emit_addr(lhs)?;
        self.emit_expr(rhs, false)?;
        self.pop("x1", "pop value");
        self.pop("x0", "pop address");
        self.emit("str", "x1, [x0]", "store");
        if !is_root {
          self.push("x1", "push stored value");
        }
      }
      ExprKind::FunCall { name, args } => {
        for arg in args {
          self.emit_expr(arg, false)?;
        }
        // Arguments were pushed left to right, so popping in reverse
        // register order lines index up with source order.
        for i in (0..args.len()).rev() {
          self.pop(ARG_REGS[i], &format!("arg {i}"));
        }
        self.emit("bl", &format!("_{name}"), "call");
        if !is_root {
          self.push("x0", "push result");
        }
      }
      ExprKind::Addr { operand } => {
        self.emit_addr(operand)?;
        if is_root {
          self.pop("x0", "pop address");
        }
      }
      ExprKind::Deref { operand } => {
        self.emit_expr(operand, false)?;
        self.pop("x0", "pop address");
        self.emit("ldr", "x0, [x0]", "load value");
        if !is_root {
          self.push("x0", "push value");
        }
      }
    }
    Ok(())
  }

  /// Compute an lvalue's address and push it. Only variables and
  /// dereferences have addresses.
  fn emit_addr(&mut self, node: &Expr) -> CompileResult<()> {
    match &node.kind {
      ExprKind::Var { obj } => {
        let local = &self.func.locals[*obj];
        let comment = format!("push address as '{}'", local.name);
        self.emit("mov", "x0, fp", "");
        self.emit("sub", &format!("x0, x0, #{}", local.offset), "");
        self.push("x0", &comment);
        Ok(())
      }
      ExprKind::Deref { operand } => {
        // The pointer value is the address.
        self.emit_expr(operand, false)
      }
      _ => Err(CompileError::type_at(self.source, node.loc, "not an lvalue")),
    }
  }

  fn push(&mut self, reg: &str, comment: &str) {
    self.emit("str", &format!("{reg}, [sp, #-16]!"), comment);
    self.depth += 1;
  }

  fn pop(&mut self, reg: &str, comment: &str) {
    self.emit("ldr", &format!("{reg}, [sp], #16"), comment);
    self.depth -= 1;
  }

  fn emit(&mut self, op: &str, args: &str, comment: &str) {
    self.asm.push('\t');
    self.asm.push_str(op);
    if !args.is_empty() {
      self.asm.push('\t');
      self.asm.push_str(args);
    }
    if !comment.is_empty() {
      self.asm.push_str(" // ");
      self.asm.push_str(comment);
    }
    self.asm.push('\n');
  }

  fn place_label(&mut self, label: &str) {
    self.asm.push_str(label);
    self.asm.push_str(":\n");
  }

  fn next_label(&mut self) -> usize {
    let c = self.label_count;
    self.label_count += 1;
    c
  }

  /// Labels carry the function name so the per-function counter cannot
  /// collide across functions in one output file.
  fn control_label(&self, kind: &str, c: usize) -> String {
    format!(".L{kind}{c}_{}", self.func.name)
  }

  fn epilogue_label(&self) -> String {
    format!(".Lreturn_{}", self.func.name)
  }
}
