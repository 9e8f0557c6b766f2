//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – these routines format
//! messages in a style reminiscent of chibicc, echoing the offending
//! source line and pointing at the failing column with a caret. Every
//! error is fatal: no stage attempts recovery or batches diagnostics.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// An unrecognized character in the input.
  #[snafu(display("{src_line}\n{marker} {message}"))]
  Lexical {
    src_line: String,
    marker: String,
    message: String,
  },
  /// An expected token or punctuator was not found.
  #[snafu(display("{src_line}\n{marker} {message}"))]
  Syntax {
    src_line: String,
    marker: String,
    message: String,
  },
  /// Invalid pointer arithmetic, dereference, or assignment target.
  #[snafu(display("{src_line}\n{marker} {message}"))]
  Type {
    src_line: String,
    marker: String,
    message: String,
  },
}

impl CompileError {
  pub fn lexical_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (src_line, marker) = locate(source, loc);
    Self::Lexical {
      src_line,
      marker,
      message: message.into(),
    }
  }

  pub fn syntax_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (src_line, marker) = locate(source, loc);
    Self::Syntax {
      src_line,
      marker,
      message: message.into(),
    }
  }

  pub fn type_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (src_line, marker) = locate(source, loc);
    Self::Type {
      src_line,
      marker,
      message: message.into(),
    }
  }
}

/// Extract the line containing `loc` and build a caret marker padded to
/// the failing column.
fn locate(source: &str, loc: usize) -> (String, String) {
  let loc = loc.min(source.len());
  let line_start = source[..loc].rfind('\n').map(|i| i + 1).unwrap_or(0);
  let line_end = source[loc..]
    .find('\n')
    .map(|i| loc + i)
    .unwrap_or(source.len());
  let src_line = source[line_start..line_end].to_string();
  let column = source[line_start..loc].chars().count();
  let marker = format!("{}^", " ".repeat(column));
  (src_line, marker)
}
