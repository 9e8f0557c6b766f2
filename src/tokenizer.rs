//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny – it knows nothing about semantics
//! beyond recognising keywords, operators, identifiers and numeric
//! literals. Keywords are matched before identifiers with a word-boundary
//! check, and multi-character punctuators are matched before
//! single-character ones to avoid ambiguity.

use crate::error::{CompileError, CompileResult};

/// Keywords of the language. A keyword only matches when the following
/// character cannot extend an identifier.
const KEYWORDS: [&str; 6] = ["return", "if", "else", "while", "for", "int"];

/// Multi-character operators, checked before their single-character prefixes.
const MULTI_CHAR_OPS: [&str; 4] = ["==", "!=", "<=", ">="];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// Keywords and punctuators.
  Reserved,
  Num,
  Ident,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

fn is_ident_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_'
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if let Some(kw) = KEYWORDS.into_iter().find(|kw| {
      input[i..].starts_with(kw) && !bytes.get(i + kw.len()).copied().is_some_and(is_ident_byte)
    }) {
      tokens.push(Token::new(TokenKind::Reserved, i, kw.len(), None));
      i += kw.len();
      continue;
    }

    if let Some(op) = MULTI_CHAR_OPS
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Reserved, i, op.len(), None));
      i += op.len();
      continue;
    }

    if c.is_ascii_lowercase() {
      let start = i;
      i += 1;
      while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Ident, start, i - start, None));
      continue;
    }

    if matches!(
      c,
      b'+'
        | b'-'
        | b'*'
        | b'/'
        | b'('
        | b')'
        | b'<'
        | b'>'
        | b'='
        | b';'
        | b','
        | b'{'
        | b'}'
        | b'&'
    ) {
      tokens.push(Token::new(TokenKind::Reserved, i, 1, None));
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .map_err(|err| CompileError::lexical_at(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::lexical_at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

/// Render the token chain for the driver's token dump, one arrow-linked
/// entry per token.
pub fn dump_tokens(tokens: &[Token], source: &str) -> String {
  tokens
    .iter()
    .map(|token| match token.kind {
      TokenKind::Eof => "eof".to_string(),
      TokenKind::Num => format!("number({})", token_text(token, source)),
      TokenKind::Ident => format!("ident({})", token_text(token, source)),
      TokenKind::Reserved => format!("reserved({})", token_text(token, source)),
    })
    .collect::<Vec<_>>()
    .join(" -> ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;

  fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
    tokenize(source)
      .unwrap()
      .iter()
      .map(|t| (t.kind, token_text(t, source).to_string()))
      .collect()
  }

  #[test]
  fn round_trips_a_spaced_token_sequence() {
    let source = "int main ( ) { return 42 ; }";
    let tokens = kinds_and_texts(source);
    let expected = [
      (TokenKind::Reserved, "int"),
      (TokenKind::Ident, "main"),
      (TokenKind::Reserved, "("),
      (TokenKind::Reserved, ")"),
      (TokenKind::Reserved, "{"),
      (TokenKind::Reserved, "return"),
      (TokenKind::Num, "42"),
      (TokenKind::Reserved, ";"),
      (TokenKind::Reserved, "}"),
      (TokenKind::Eof, ""),
    ];
    assert_eq!(tokens.len(), expected.len());
    for (got, want) in tokens.iter().zip(expected) {
      assert_eq!(got.0, want.0);
      assert_eq!(got.1, want.1);
    }
  }

  #[test]
  fn keyword_requires_a_word_boundary() {
    let tokens = kinds_and_texts("intx forty return_");
    assert_eq!(
      tokens,
      vec![
        (TokenKind::Ident, "intx".to_string()),
        (TokenKind::Ident, "forty".to_string()),
        (TokenKind::Ident, "return_".to_string()),
        (TokenKind::Eof, String::new()),
      ]
    );
  }

  #[test]
  fn multi_char_operators_win_over_prefixes() {
    let tokens = kinds_and_texts("a<=b == c");
    let texts: Vec<&str> = tokens.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(texts, vec!["a", "<=", "b", "==", "c", ""]);
  }

  #[test]
  fn identifiers_allow_digits_and_underscores() {
    let tokens = kinds_and_texts("x_1 abc9");
    assert_eq!(tokens[0], (TokenKind::Ident, "x_1".to_string()));
    assert_eq!(tokens[1], (TokenKind::Ident, "abc9".to_string()));
  }

  #[test]
  fn number_tokens_carry_their_value() {
    let tokens = tokenize("123").unwrap();
    assert_eq!(tokens[0].value, Some(123));
  }

  #[test]
  fn unrecognised_character_is_a_lexical_error() {
    let err = tokenize("1 $ 2").unwrap_err();
    assert!(matches!(err, CompileError::Lexical { .. }));
    assert!(err.to_string().contains("invalid token: '$'"));
  }

  #[test]
  fn stream_always_ends_with_eof() {
    let tokens = tokenize("").unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
  }

  #[test]
  fn dump_renders_the_chain() {
    let source = "a = 1;";
    let tokens = tokenize(source).unwrap();
    assert_eq!(
      dump_tokens(&tokens, source),
      "ident(a) -> reserved(=) -> number(1) -> reserved(;) -> eof"
    );
  }
}
