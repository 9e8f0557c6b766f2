//! Recursive-descent parser producing a function list with statement
//! chains and expression ASTs.
//!
//! The parser mirrors the classic chibicc structure: we maintain a
//! precedence-climbing set of helpers and expose a thin statement layer so
//! sequencing lives outside the expression tree. Identifiers are resolved
//! inline as parsing proceeds – there is a single flat variable list per
//! function and no forward references, so one pass suffices. Consumption
//! of tokens is destructive; the grammar is ordered so no backtracking is
//! ever required.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::Type;

/// The calling convention passes arguments in `x0`..`x5`.
pub const MAX_CALL_ARGS: usize = 6;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let symbol = match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
    };
    f.write_str(symbol)
  }
}

/// Expression tree produced by the parser. The `ty` field starts out
/// `None` and is filled in exactly once by the annotation pass; `loc` is
/// the source offset used for diagnostics in later stages.
#[derive(Debug, Clone)]
pub struct Expr {
  pub kind: ExprKind,
  pub ty: Option<Type>,
  pub loc: usize,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
  Num {
    value: i64,
  },
  /// Index into the owning function's `locals`.
  Var {
    obj: usize,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Assign {
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  /// Call targets are never checked against a declared-function table;
  /// unknown names are resolved by the external assembler/linker.
  FunCall {
    name: String,
    args: Vec<Expr>,
  },
  Addr {
    operand: Box<Expr>,
  },
  Deref {
    operand: Box<Expr>,
  },
}

impl Expr {
  pub fn number(value: i64, loc: usize) -> Self {
    Self::new(ExprKind::Num { value }, loc)
  }

  pub fn var(obj: usize, loc: usize) -> Self {
    Self::new(ExprKind::Var { obj }, loc)
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      loc,
    )
  }

  pub fn assign(lhs: Expr, rhs: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Assign {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      loc,
    )
  }

  pub fn fun_call(name: String, args: Vec<Expr>, loc: usize) -> Self {
    Self::new(ExprKind::FunCall { name, args }, loc)
  }

  pub fn addr(operand: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Addr {
        operand: Box::new(operand),
      },
      loc,
    )
  }

  pub fn deref(operand: Expr, loc: usize) -> Self {
    Self::new(
      ExprKind::Deref {
        operand: Box::new(operand),
      },
      loc,
    )
  }

  fn new(kind: ExprKind, loc: usize) -> Self {
    Self {
      kind,
      ty: None,
      loc,
    }
  }
}

/// Singly-linked list of statements. Sequencing lives in the `next`
/// chain rather than in an array so blocks can be rebuilt by prepending
/// and a single reversal.
#[derive(Debug, Clone)]
pub struct Stmt {
  pub kind: StmtKind,
  pub next: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
  Expr(Expr),
  Return(Expr),
  If {
    cond: Expr,
    then: Box<Stmt>,
    els: Option<Box<Stmt>>,
  },
  While {
    cond: Expr,
    body: Box<Stmt>,
  },
  For {
    init: Option<Expr>,
    cond: Option<Expr>,
    step: Option<Expr>,
    body: Box<Stmt>,
  },
  Block {
    body: Option<Box<Stmt>>,
  },
  /// A declaration without an initializer registers its variable during
  /// parsing and emits no code.
  Empty,
}

impl Stmt {
  fn new(kind: StmtKind) -> Self {
    Self { kind, next: None }
  }

  /// Iterate this statement and its successors in stored order.
  pub fn iter(&self) -> StmtIter<'_> {
    StmtIter {
      current: Some(self),
    }
  }
}

pub struct StmtIter<'a> {
  current: Option<&'a Stmt>,
}

impl<'a> Iterator for StmtIter<'a> {
  type Item = &'a Stmt;

  fn next(&mut self) -> Option<Self::Item> {
    let stmt = self.current?;
    self.current = stmt.next.as_deref();
    Some(stmt)
  }
}

/// A stack-resident variable. Offsets are counted down from the frame
/// base, one 8-byte word per variable.
#[derive(Debug, Clone)]
pub struct LocalVariable {
  pub name: String,
  pub offset: i64,
  pub ty: Type,
}

/// A parsed function. `params` holds indices into `locals`; parameters
/// are allocated before the body is parsed so their slots never collide
/// with later locals.
#[derive(Debug, Clone)]
pub struct Function {
  pub name: String,
  pub params: Vec<usize>,
  pub body: Option<Box<Stmt>>,
  pub locals: Vec<LocalVariable>,
  pub stack_size: i64,
}

/// Parse a whole program: a sequence of function definitions.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Vec<Function>> {
  let mut stream = TokenStream::new(tokens, source);

  if stream.is_eof() {
    return Err(CompileError::syntax_at(source, 0, "program is empty"));
  }

  let mut functions = Vec::new();
  while !stream.is_eof() {
    functions.push(parse_function(&mut stream)?);
  }

  Ok(functions)
}

/// Per-function variable list threaded through parsing. Every identifier
/// lookup consults it before a new slot is allocated.
struct FunctionBuilder {
  locals: Vec<LocalVariable>,
}

impl FunctionBuilder {
  fn new() -> Self {
    Self { locals: Vec::new() }
  }

  /// Find a variable by name, or allocate a fresh slot one word below the
  /// current maximum. The first declaration wins: a matching entry is
  /// reused as-is.
  fn resolve(&mut self, name: &str, ty: Type) -> usize {
    if let Some(idx) = self.locals.iter().position(|local| local.name == name) {
      return idx;
    }
    let offset = self.locals.last().map(|local| local.offset).unwrap_or(0) + 8;
    self.locals.push(LocalVariable {
      name: name.to_string(),
      offset,
      ty,
    });
    self.locals.len() - 1
  }

  fn max_offset(&self) -> i64 {
    self.locals.last().map(|local| local.offset).unwrap_or(0)
  }
}

fn align_to(n: i64, align: i64) -> i64 {
  (n + align - 1) / align * align
}

/// function = "int" identifier "(" params? ")" "{" stmt* "}"
fn parse_function(stream: &mut TokenStream) -> CompileResult<Function> {
  stream.skip("int")?;
  let (name, _) = stream.get_ident()?;
  let mut fb = FunctionBuilder::new();

  stream.skip("(")?;
  let mut params = Vec::new();
  if !stream.equal(")") {
    loop {
      let (obj, loc) = parse_param(stream, &mut fb)?;
      if params.len() == MAX_CALL_ARGS {
        return Err(CompileError::syntax_at(
          stream.source,
          loc,
          format!("too many parameters (the calling convention passes at most {MAX_CALL_ARGS})"),
        ));
      }
      params.push(obj);
      if !stream.equal(",") {
        break;
      }
    }
    stream.skip(")")?;
  }

  stream.skip("{")?;
  let body = parse_block_body(stream, &mut fb)?;

  // The stack-alignment invariant: frames are a multiple of 16 bytes and
  // never smaller than one slot pair.
  let stack_size = align_to(fb.max_offset(), 16).max(16);

  Ok(Function {
    name,
    params,
    body,
    locals: fb.locals,
    stack_size,
  })
}

/// param = "int" "*"* identifier
fn parse_param(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<(usize, usize)> {
  stream.skip("int")?;
  let mut ty = Type::int();
  while stream.equal("*") {
    ty = Type::pointer_to(ty);
  }
  let (name, loc) = stream.get_ident()?;
  Ok((fb.resolve(&name, ty), loc))
}

/// Collect statements up to the closing brace, then link them in reverse
/// so the chain runs in declaration order.
fn parse_block_body(
  stream: &mut TokenStream,
  fb: &mut FunctionBuilder,
) -> CompileResult<Option<Box<Stmt>>> {
  let mut stmts = Vec::new();
  while !stream.equal("}") {
    stmts.push(parse_stmt(stream, fb)?);
  }

  let mut head = None;
  for mut stmt in stmts.into_iter().rev() {
    stmt.next = head;
    head = Some(Box::new(stmt));
  }
  Ok(head)
}

/// stmt = "return" expr ";"
///      | "if" "(" expr ")" stmt ("else" stmt)?
///      | "while" "(" expr ")" stmt
///      | "for" "(" expr? ";" expr? ";" expr? ")" stmt
///      | "{" stmt* "}"
///      | "int" "*"* identifier ("=" expr)? ";"
///      | expr ";"
fn parse_stmt(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Stmt> {
  if stream.equal("return") {
    let operand = parse_expr(stream, fb)?;
    stream.skip(";")?;
    return Ok(Stmt::new(StmtKind::Return(operand)));
  }

  if stream.equal("if") {
    stream.skip("(")?;
    let cond = parse_expr(stream, fb)?;
    stream.skip(")")?;
    let then = Box::new(parse_stmt(stream, fb)?);
    let els = if stream.equal("else") {
      Some(Box::new(parse_stmt(stream, fb)?))
    } else {
      None
    };
    return Ok(Stmt::new(StmtKind::If { cond, then, els }));
  }

  if stream.equal("while") {
    stream.skip("(")?;
    let cond = parse_expr(stream, fb)?;
    stream.skip(")")?;
    let body = Box::new(parse_stmt(stream, fb)?);
    return Ok(Stmt::new(StmtKind::While { cond, body }));
  }

  if stream.equal("for") {
    stream.skip("(")?;
    let init = if stream.equal(";") {
      None
    } else {
      let expr = parse_expr(stream, fb)?;
      stream.skip(";")?;
      Some(expr)
    };
    let cond = if stream.equal(";") {
      None
    } else {
      let expr = parse_expr(stream, fb)?;
      stream.skip(";")?;
      Some(expr)
    };
    let step = if stream.equal(")") {
      None
    } else {
      let expr = parse_expr(stream, fb)?;
      stream.skip(")")?;
      Some(expr)
    };
    let body = Box::new(parse_stmt(stream, fb)?);
    return Ok(Stmt::new(StmtKind::For {
      init,
      cond,
      step,
      body,
    }));
  }

  if stream.equal("{") {
    let body = parse_block_body(stream, fb)?;
    return Ok(Stmt::new(StmtKind::Block { body }));
  }

  if stream.equal("int") {
    return parse_declaration(stream, fb);
  }

  let expr = parse_expr(stream, fb)?;
  stream.skip(";")?;
  Ok(Stmt::new(StmtKind::Expr(expr)))
}

/// Declaration after its leading "int" has been consumed. A bare
/// declaration only registers the variable; an initializer lowers to an
/// assignment statement.
fn parse_declaration(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Stmt> {
  let mut ty = Type::int();
  while stream.equal("*") {
    ty = Type::pointer_to(ty);
  }
  let (name, loc) = stream.get_ident()?;
  let obj = fb.resolve(&name, ty);

  if stream.equal("=") {
    let rhs = parse_expr(stream, fb)?;
    stream.skip(";")?;
    let assignment = Expr::assign(Expr::var(obj, loc), rhs, loc);
    return Ok(Stmt::new(StmtKind::Expr(assignment)));
  }

  stream.skip(";")?;
  Ok(Stmt::new(StmtKind::Empty))
}

/// expr = assign
fn parse_expr(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  parse_assign(stream, fb)
}

/// assign = equality ("=" assign)?
fn parse_assign(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let node = parse_equality(stream, fb)?;

  let loc = stream.loc();
  if stream.equal("=") {
    let rhs = parse_assign(stream, fb)?;
    return Ok(Expr::assign(node, rhs, loc));
  }

  Ok(node)
}

/// equality = relational (("==" | "!=") relational)*
fn parse_equality(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let mut node = parse_relational(stream, fb)?;

  loop {
    let loc = stream.loc();
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Reserved)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "==") => symbol,
      Some(symbol @ "!=") => symbol,
      _ => break,
    };

    let op = match op_str {
      "==" => BinaryOp::Eq,
      "!=" => BinaryOp::Ne,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_relational(stream, fb)?;
    node = Expr::binary(op, node, rhs, loc);
  }

  Ok(node)
}

/// relational = add (("<" | "<=" | ">" | ">=") add)*
fn parse_relational(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let mut node = parse_add(stream, fb)?;

  loop {
    let loc = stream.loc();
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Reserved)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "<") => symbol,
      Some(symbol @ "<=") => symbol,
      Some(symbol @ ">") => symbol,
      Some(symbol @ ">=") => symbol,
      _ => break,
    };

    let op = match op_str {
      "<" => BinaryOp::Lt,
      "<=" => BinaryOp::Le,
      ">" => BinaryOp::Gt,
      ">=" => BinaryOp::Ge,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_add(stream, fb)?;
    node = Expr::binary(op, node, rhs, loc);
  }

  Ok(node)
}

/// add = mul (("+" | "-") mul)*
fn parse_add(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let mut node = parse_mul(stream, fb)?;

  loop {
    let loc = stream.loc();
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Reserved)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "+") => symbol,
      Some(symbol @ "-") => symbol,
      _ => break,
    };

    let op = match op_str {
      "+" => BinaryOp::Add,
      "-" => BinaryOp::Sub,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_mul(stream, fb)?;
    node = Expr::binary(op, node, rhs, loc);
  }

  Ok(node)
}

/// mul = unary (("*" | "/") unary)*
fn parse_mul(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let mut node = parse_unary(stream, fb)?;

  loop {
    let loc = stream.loc();
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Reserved)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "*") => symbol,
      Some(symbol @ "/") => symbol,
      _ => break,
    };

    let op = match op_str {
      "*" => BinaryOp::Mul,
      "/" => BinaryOp::Div,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_unary(stream, fb)?;
    node = Expr::binary(op, node, rhs, loc);
  }

  Ok(node)
}

/// unary = "+" unary | "-" unary | "*" unary | "&" unary | primary
///
/// Unary minus lowers to `0 - operand` so codegen only ever sees binary
/// subtraction.
fn parse_unary(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  let loc = stream.loc();

  if stream.equal("+") {
    return parse_unary(stream, fb);
  }

  if stream.equal("-") {
    let operand = parse_unary(stream, fb)?;
    return Ok(Expr::binary(
      BinaryOp::Sub,
      Expr::number(0, loc),
      operand,
      loc,
    ));
  }

  if stream.equal("*") {
    let operand = parse_unary(stream, fb)?;
    return Ok(Expr::deref(operand, loc));
  }

  if stream.equal("&") {
    let operand = parse_unary(stream, fb)?;
    return Ok(Expr::addr(operand, loc));
  }

  parse_primary(stream, fb)
}

/// primary = number | identifier ("(" args? ")")? | "(" expr ")"
fn parse_primary(stream: &mut TokenStream, fb: &mut FunctionBuilder) -> CompileResult<Expr> {
  if stream.equal("(") {
    let node = parse_expr(stream, fb)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if matches!(
    stream.peek().map(|token| token.kind),
    Some(TokenKind::Ident)
  ) {
    let (name, loc) = stream.get_ident()?;

    if stream.equal("(") {
      let mut args = Vec::new();
      if !stream.equal(")") {
        loop {
          args.push(parse_assign(stream, fb)?);
          if !stream.equal(",") {
            break;
          }
        }
        stream.skip(")")?;
      }
      if args.len() > MAX_CALL_ARGS {
        return Err(CompileError::syntax_at(
          stream.source,
          loc,
          format!("too many arguments (the calling convention passes at most {MAX_CALL_ARGS})"),
        ));
      }
      return Ok(Expr::fun_call(name, args, loc));
    }

    // A bare identifier auto-declares on first use with type int.
    let obj = fb.resolve(&name, Type::int());
    return Ok(Expr::var(obj, loc));
  }

  let (value, loc) = stream.get_number()?;
  Ok(Expr::number(value, loc))
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Source offset of the current token.
  fn loc(&self) -> usize {
    self.peek().map(|token| token.loc).unwrap_or(self.source.len())
  }

  /// Consume the current token if it matches the provided reserved word
  /// or punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Reserved
      && token.len == op.len()
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let (loc, got) = match self.tokens.get(self.pos) {
        Some(token) => (token.loc, describe_token(Some(token), self.source)),
        None => (self.source.len(), "EOF".to_string()),
      };
      Err(CompileError::syntax_at(
        self.source,
        loc,
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax_at(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    let (loc, got) = match self.tokens.get(self.pos) {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax_at(
      self.source,
      loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Ident
    {
      let name = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((name, loc));
    }

    let (loc, got) = match self.tokens.get(self.pos) {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax_at(
      self.source,
      loc,
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}

impl Function {
  /// Render the function as an s-expression for the driver's syntax-tree
  /// dumps. Type suffixes appear once the annotation pass has run.
  pub fn dump(&self) -> String {
    let params: Vec<&str> = self
      .params
      .iter()
      .map(|&obj| self.locals[obj].name.as_str())
      .collect();
    let mut out = format!("{}({}) [stack {}]", self.name, params.join(", "), self.stack_size);
    if let Some(body) = &self.body {
      for stmt in body.iter() {
        out.push(' ');
        out.push_str(&dump_stmt(stmt, &self.locals));
      }
    }
    out
  }
}

fn dump_stmt(stmt: &Stmt, locals: &[LocalVariable]) -> String {
  match &stmt.kind {
    StmtKind::Expr(expr) => dump_expr(expr, locals),
    StmtKind::Return(expr) => format!("(ret {})", dump_expr(expr, locals)),
    StmtKind::If { cond, then, els } => match els {
      Some(els) => format!(
        "(if {} {} {})",
        dump_expr(cond, locals),
        dump_stmt(then, locals),
        dump_stmt(els, locals)
      ),
      None => format!("(if {} {})", dump_expr(cond, locals), dump_stmt(then, locals)),
    },
    StmtKind::While { cond, body } => format!(
      "(while {} {})",
      dump_expr(cond, locals),
      dump_stmt(body, locals)
    ),
    StmtKind::For {
      init,
      cond,
      step,
      body,
    } => {
      let part = |expr: &Option<Expr>| match expr {
        Some(expr) => dump_expr(expr, locals),
        None => String::new(),
      };
      format!(
        "(for {}; {}; {} {})",
        part(init),
        part(cond),
        part(step),
        dump_stmt(body, locals)
      )
    }
    StmtKind::Block { body } => {
      let mut out = String::from("({");
      if let Some(body) = body {
        for stmt in body.iter() {
          out.push(' ');
          out.push_str(&dump_stmt(stmt, locals));
        }
      }
      out.push_str(" })");
      out
    }
    StmtKind::Empty => ";".to_string(),
  }
}

fn dump_expr(expr: &Expr, locals: &[LocalVariable]) -> String {
  let body = match &expr.kind {
    ExprKind::Num { value } => value.to_string(),
    ExprKind::Var { obj } => {
      let local = &locals[*obj];
      format!("lvar '{}'[{}]", local.name, local.offset)
    }
    ExprKind::Binary { op, lhs, rhs } => format!(
      "({} {} {})",
      dump_expr(lhs, locals),
      op,
      dump_expr(rhs, locals)
    ),
    ExprKind::Assign { lhs, rhs } => format!(
      "({} = {})",
      dump_expr(lhs, locals),
      dump_expr(rhs, locals)
    ),
    ExprKind::FunCall { name, args } => {
      let args: Vec<String> = args.iter().map(|arg| dump_expr(arg, locals)).collect();
      format!("(call {} {})", name, args.join(" "))
    }
    ExprKind::Addr { operand } => format!("(& {})", dump_expr(operand, locals)),
    ExprKind::Deref { operand } => format!("(* {})", dump_expr(operand, locals)),
  };
  match &expr.ty {
    Some(ty) => format!("{body}:{ty}"),
    None => body,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;
  use crate::tokenizer::tokenize;

  fn parse_source(source: &str) -> CompileResult<Vec<Function>> {
    parse(tokenize(source).unwrap(), source)
  }

  #[test]
  fn scenario_single_function_frame_layout() {
    let program = parse_source("int main(){int a; a=3; return a+2;}").unwrap();
    assert_eq!(program.len(), 1);
    let main = &program[0];
    assert_eq!(main.name, "main");
    assert_eq!(main.stack_size, 16);
    assert_eq!(main.locals.len(), 1);
    assert_eq!(main.locals[0].name, "a");
    assert_eq!(main.locals[0].offset, 8);
  }

  #[test]
  fn offsets_grow_by_one_word_in_first_use_order() {
    let program = parse_source("int main(){int a; int b; int c; return a+b+c;}").unwrap();
    let offsets: Vec<i64> = program[0].locals.iter().map(|l| l.offset).collect();
    assert_eq!(offsets, vec![8, 16, 24]);
    assert_eq!(program[0].stack_size, 32);
  }

  #[test]
  fn parameters_get_slots_before_body_locals() {
    let program = parse_source("int f(int a, int b){int c; return a+b+c;}").unwrap();
    let f = &program[0];
    assert_eq!(f.params, vec![0, 1]);
    assert_eq!(f.locals[0].name, "a");
    assert_eq!(f.locals[0].offset, 8);
    assert_eq!(f.locals[1].name, "b");
    assert_eq!(f.locals[1].offset, 16);
    assert_eq!(f.locals[2].name, "c");
    assert_eq!(f.locals[2].offset, 24);
  }

  #[test]
  fn function_with_no_locals_still_reserves_a_frame() {
    let program = parse_source("int main(){return 0;}").unwrap();
    assert_eq!(program[0].stack_size, 16);
  }

  #[test]
  fn bare_identifier_auto_declares_as_int() {
    let program = parse_source("int main(){x=1; return x;}").unwrap();
    let main = &program[0];
    assert_eq!(main.locals.len(), 1);
    assert_eq!(main.locals[0].name, "x");
    assert!(!main.locals[0].ty.is_pointer());
  }

  #[test]
  fn redeclaration_reuses_the_matched_entry() {
    let program = parse_source("int main(){int a; int a; return a;}").unwrap();
    assert_eq!(program[0].locals.len(), 1);
  }

  #[test]
  fn call_target_needs_no_prior_declaration() {
    let program = parse_source("int main(){return f(21);}").unwrap();
    let main = &program[0];
    let Some(body) = &main.body else {
      panic!("missing body");
    };
    let StmtKind::Return(expr) = &body.kind else {
      panic!("expected return");
    };
    let ExprKind::FunCall { name, args } = &expr.kind else {
      panic!("expected call");
    };
    assert_eq!(name, "f");
    assert_eq!(args.len(), 1);
  }

  #[test]
  fn pointer_declaration_records_the_declared_type() {
    let program = parse_source("int main(){int **p; return 0;}").unwrap();
    let p = &program[0].locals[0];
    assert!(p.ty.is_pointer());
    assert!(p.ty.base().is_some_and(Type::is_pointer));
  }

  #[test]
  fn declaration_with_initializer_lowers_to_assignment() {
    let program = parse_source("int main(){int a = 5; return a;}").unwrap();
    let Some(body) = &program[0].body else {
      panic!("missing body");
    };
    let StmtKind::Expr(expr) = &body.kind else {
      panic!("expected expression statement");
    };
    assert!(matches!(expr.kind, ExprKind::Assign { .. }));
  }

  #[test]
  fn block_preserves_statement_order() {
    let program = parse_source("int main(){{1; 2; 3;}}").unwrap();
    let Some(body) = &program[0].body else {
      panic!("missing body");
    };
    let StmtKind::Block { body: Some(inner) } = &body.kind else {
      panic!("expected block");
    };
    let values: Vec<i64> = inner
      .iter()
      .map(|stmt| match &stmt.kind {
        StmtKind::Expr(Expr {
          kind: ExprKind::Num { value },
          ..
        }) => *value,
        other => panic!("unexpected statement {other:?}"),
      })
      .collect();
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[test]
  fn for_clauses_are_independently_optional() {
    parse_source("int main(){for(;;) return 0;}").unwrap();
    parse_source("int main(){int i; for(i=0; i<10; i=i+1) x=i; return x;}").unwrap();
    parse_source("int main(){int i; for(; i<10;) i=i+1; return i;}").unwrap();
  }

  #[test]
  fn seventh_call_argument_is_rejected() {
    let err = parse_source("int main(){return f(1,2,3,4,5,6,7);}").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert!(err.to_string().contains("too many arguments"));
  }

  #[test]
  fn seventh_parameter_is_rejected() {
    let err =
      parse_source("int f(int a, int b, int c, int d, int e, int g, int h){return 0;}")
        .unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn missing_semicolon_is_a_syntax_error() {
    let err = parse_source("int main(){return 1}").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert!(err.to_string().contains("expected \";\""));
  }

  #[test]
  fn empty_program_is_rejected() {
    let err = parse_source("").unwrap_err();
    assert!(err.to_string().contains("program is empty"));
  }

  #[test]
  fn unary_minus_lowers_to_zero_minus_operand() {
    let program = parse_source("int main(){return -5;}").unwrap();
    let Some(body) = &program[0].body else {
      panic!("missing body");
    };
    let StmtKind::Return(expr) = &body.kind else {
      panic!("expected return");
    };
    let ExprKind::Binary { op, lhs, .. } = &expr.kind else {
      panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(lhs.kind, ExprKind::Num { value: 0 }));
  }

  #[test]
  fn dump_shows_variables_with_offsets() {
    let program = parse_source("int main(){int a; return a+2;}").unwrap();
    let dump = program[0].dump();
    assert!(dump.contains("lvar 'a'[8]"));
    assert!(dump.contains("(ret"));
  }
}
