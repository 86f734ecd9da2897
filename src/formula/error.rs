//! Errors raised while parsing or evaluating a formula.

use thiserror::Error;

/// Errors raised while parsing or evaluating a formula.
///
/// `pos` fields are byte offsets into the formula source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
  #[error("unexpected character '{ch}' at {pos}")]
  UnexpectedChar { ch: char, pos: usize },
  #[error("unterminated string literal starting at {pos}")]
  UnterminatedString { pos: usize },
  #[error("invalid number literal '{text}' at {pos}")]
  InvalidNumber { text: String, pos: usize },
  #[error("expected {expected}, found {found} at {pos}")]
  UnexpectedToken {
    expected: &'static str,
    found: String,
    pos: usize,
  },
  #[error("expression nested too deeply at {pos}")]
  TooDeep { pos: usize },
  #[error("name '{0}' is not defined")]
  UnknownName(String),
  #[error("unknown function '{name}' at {pos}")]
  UnknownFunction { name: String, pos: usize },
  #[error("{function}() takes {expected} argument(s), got {got}")]
  Arity {
    function: &'static str,
    expected: &'static str,
    got: usize,
  },
  #[error("unsupported operand type(s) for {op}: {operands}")]
  Type { op: String, operands: String },
  #[error("division by zero")]
  DivisionByZero,
  #[error("invalid isoformat string: '{0}'")]
  InvalidDate(String),
  #[error("could not convert '{0}' to a number")]
  InvalidConversion(String),
  #[error("result out of range: {0}")]
  OutOfRange(String),
}

impl FormulaError {
  pub(crate) fn type_error(op: &str, kinds: &[&str]) -> Self {
    FormulaError::Type {
      op: op.to_string(),
      operands: kinds
        .iter()
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>()
        .join(" and "),
    }
  }
}
