//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be
//! invoked independently (the driver uses this for its stage dumps):
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns a function list
//!   with per-function locals and frame sizes.
//! - `ty` annotates every expression with its type, bottom-up, and
//!   canonicalises pointer arithmetic.
//! - `codegen` lowers the typed functions into AArch64 assembly.
//! - `error` centralises reporting utilities shared by the other modules.
//!
//! Data flows strictly forward: text → tokens → untyped AST → typed AST
//! → assembly text. The first error at any stage aborts the pipeline.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod ty;

pub use error::{CompileError, CompileResult};

/// Compile a source string into AArch64 assembly.
pub fn compile(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  let mut program = parser::parse(tokens, source)?;
  ty::annotate(&mut program, source)?;
  codegen::generate(&program, source)
}
