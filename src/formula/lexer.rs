//! Tokenizer for the formula language.

use super::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Number(f64),
  Str(String),
  Ident(String),
  And,
  Or,
  Not,
  If,
  Else,
  True,
  False,
  None,
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  EqEq,
  NotEq,
  Lt,
  Le,
  Gt,
  Ge,
  LParen,
  RParen,
  Comma,
  Eof,
}

impl TokenKind {
  /// Human-readable form used in parse errors.
  pub fn describe(&self) -> String {
    match self {
      TokenKind::Number(n) => format!("number {n}"),
      TokenKind::Str(s) => format!("string '{s}'"),
      TokenKind::Ident(name) => format!("name '{name}'"),
      TokenKind::Eof => "end of formula".to_string(),
      other => format!("'{}'", other.symbol()),
    }
  }

  fn symbol(&self) -> &'static str {
    match self {
      TokenKind::And => "and",
      TokenKind::Or => "or",
      TokenKind::Not => "not",
      TokenKind::If => "if",
      TokenKind::Else => "else",
      TokenKind::True => "True",
      TokenKind::False => "False",
      TokenKind::None => "None",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Star => "*",
      TokenKind::Slash => "/",
      TokenKind::Percent => "%",
      TokenKind::EqEq => "==",
      TokenKind::NotEq => "!=",
      TokenKind::Lt => "<",
      TokenKind::Le => "<=",
      TokenKind::Gt => ">",
      TokenKind::Ge => ">=",
      TokenKind::LParen => "(",
      TokenKind::RParen => ")",
      TokenKind::Comma => ",",
      TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::Ident(_) | TokenKind::Eof => "",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  /// Byte offset of the first character.
  pub pos: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
  Some(match word {
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "True" | "true" => TokenKind::True,
    "False" | "false" => TokenKind::False,
    "None" | "null" => TokenKind::None,
    _ => return None,
  })
}

/// Splits `source` into tokens, always ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
  let bytes = source.as_bytes();
  let mut tokens = Vec::new();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }
    let start = i;

    if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
      let (n, end) = scan_number(source, start)?;
      tokens.push(Token {
        kind: TokenKind::Number(n),
        pos: start,
      });
      i = end;
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let word = &source[start..i];
      let kind = keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()));
      tokens.push(Token { kind, pos: start });
      continue;
    }

    if c == b'"' || c == b'\'' {
      let (s, end) = scan_string(source, start)?;
      tokens.push(Token {
        kind: TokenKind::Str(s),
        pos: start,
      });
      i = end;
      continue;
    }

    let two = bytes.get(i + 1).copied();
    let (kind, len) = match (c, two) {
      (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
      (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
      (b'<', Some(b'=')) => (TokenKind::Le, 2),
      (b'>', Some(b'=')) => (TokenKind::Ge, 2),
      (b'<', _) => (TokenKind::Lt, 1),
      (b'>', _) => (TokenKind::Gt, 1),
      (b'+', _) => (TokenKind::Plus, 1),
      (b'-', _) => (TokenKind::Minus, 1),
      (b'*', _) => (TokenKind::Star, 1),
      (b'/', _) => (TokenKind::Slash, 1),
      (b'%', _) => (TokenKind::Percent, 1),
      (b'(', _) => (TokenKind::LParen, 1),
      (b')', _) => (TokenKind::RParen, 1),
      (b',', _) => (TokenKind::Comma, 1),
      _ => {
        let ch = source[start..].chars().next().unwrap_or('?');
        return Err(FormulaError::UnexpectedChar { ch, pos: start });
      }
    };
    tokens.push(Token { kind, pos: start });
    i += len;
  }

  tokens.push(Token {
    kind: TokenKind::Eof,
    pos: source.len(),
  });
  Ok(tokens)
}

/// Scans `123`, `1.5`, `.5`, `1e3`, `2.5E-2`. Returns the value and the end offset.
fn scan_number(source: &str, start: usize) -> Result<(f64, usize), FormulaError> {
  let bytes = source.as_bytes();
  let mut end = start;
  while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
    end += 1;
  }
  if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
    let mut exp = end + 1;
    if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
      exp += 1;
    }
    if exp < bytes.len() && bytes[exp].is_ascii_digit() {
      end = exp;
      while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
      }
    }
  }
  let text = &source[start..end];
  text
    .parse::<f64>()
    .map(|n| (n, end))
    .map_err(|_| FormulaError::InvalidNumber {
      text: text.to_string(),
      pos: start,
    })
}

/// Scans a quoted string with `\n`, `\t`, `\\` and quote escapes.
fn scan_string(source: &str, start: usize) -> Result<(String, usize), FormulaError> {
  let mut chars = source[start..].char_indices();
  let Some((_, quote)) = chars.next() else {
    return Err(FormulaError::UnterminatedString { pos: start });
  };
  let mut out = String::new();
  while let Some((offset, ch)) = chars.next() {
    match ch {
      '\\' => match chars.next() {
        Some((_, 'n')) => out.push('\n'),
        Some((_, 't')) => out.push('\t'),
        Some((_, other)) => out.push(other),
        None => break,
      },
      c if c == quote => return Ok((out, start + offset + c.len_utf8())),
      c => out.push(c),
    }
  }
  Err(FormulaError::UnterminatedString { pos: start })
}
