//! A small expression language for computation node code.
//!
//! Formulas see only the variables bound from a node's inputs and a fixed
//! set of builtins:
//!
//! | builtin | result |
//! |---------|--------|
//! | `max(a, ...)`, `min(a, ...)` | largest / smallest argument (numbers, strings, datetimes) |
//! | `abs(x)` | absolute value |
//! | `round(x[, n])` | rounded to `n` decimals, ties to even |
//! | `date_from_iso(s)` | datetime parsed from ISO 8601 text |
//! | `days(n)` | duration of `n` days |
//! | `iso(d)` | ISO 8601 text of a datetime |
//! | `str(x)`, `float(x)`, `int(x)`, `bool(x)` | conversions |
//! | `strip(s)` | text without surrounding whitespace |
//!
//! ```
//! use std::collections::BTreeMap;
//! use propgraph::formula::{Formula, Value};
//!
//! let f = Formula::parse("price * quantity").unwrap();
//! let mut env = BTreeMap::new();
//! env.insert("price".to_string(), Value::Number(100.0));
//! env.insert("quantity".to_string(), Value::Number(5.0));
//! assert_eq!(f.evaluate(&env).unwrap(), Value::Number(500.0));
//! ```

use std::collections::BTreeSet;

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::{BinaryOp, Builtin, CompareOp, Expr, LogicalOp, UnaryOp};
pub use error::FormulaError;
pub use eval::Bindings;
pub use value::Value;

/// A parsed formula, ready to evaluate any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
  source: String,
  expr: Expr,
}

impl Formula {
  pub fn parse(source: &str) -> Result<Self, FormulaError> {
    Ok(Self {
      source: source.to_string(),
      expr: parser::parse(source)?,
    })
  }

  pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, FormulaError> {
    eval::evaluate(&self.expr, bindings)
  }

  /// Variable names the formula reads.
  pub fn variables(&self) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    self.expr.collect_variables(&mut names);
    names
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn expr(&self) -> &Expr {
    &self.expr
  }
}

impl std::fmt::Display for Formula {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.source)
  }
}
