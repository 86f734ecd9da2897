//! Runtime values of the formula language and their conversion to and from
//! stored property values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};

use super::FormulaError;
use crate::types::PropertyValue;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Runtime value of the formula language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Number(f64),
  Str(String),
  DateTime(DateTime<FixedOffset>),
  Duration(TimeDelta),
}

impl Value {
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "NoneType",
      Value::Bool(_) => "bool",
      Value::Number(_) => "float",
      Value::Str(_) => "str",
      Value::DateTime(_) => "datetime",
      Value::Duration(_) => "timedelta",
    }
  }

  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(b) => *b,
      Value::Number(n) => *n != 0.0,
      Value::Str(s) => !s.is_empty(),
      Value::DateTime(_) => true,
      Value::Duration(d) => !d.is_zero(),
    }
  }

  /// Numeric view; booleans count as 0/1.
  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
      _ => None,
    }
  }

  /// Equality as `==` sees it: numbers and booleans compare numerically,
  /// other mixed kinds are simply unequal.
  pub fn loose_eq(&self, other: &Value) -> bool {
    if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
      return a == b;
    }
    self == other
  }

  /// Ordering for `<`, `max`, `min`. Datetimes compare as instants, so
  /// sub-day precision is kept.
  pub fn try_cmp(&self, other: &Value, op: &str) -> Result<Ordering, FormulaError> {
    let ord = match (self, other) {
      (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
      (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
      (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
      _ => match (self.as_number(), other.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => None,
      },
    };
    ord.ok_or_else(|| FormulaError::type_error(op, &[self.kind(), other.kind()]))
  }

  /// Reads a stored property. Arrays and objects are seen as their JSON text.
  pub fn from_property(value: &PropertyValue) -> Self {
    match value {
      PropertyValue::Null => Value::Null,
      PropertyValue::Bool(b) => Value::Bool(*b),
      PropertyValue::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
      PropertyValue::String(s) => Value::Str(s.clone()),
      other => Value::Str(other.to_string()),
    }
  }

  /// Converts a result for storage: datetimes become ISO 8601 strings and
  /// durations become fractional day counts.
  pub fn into_property(self) -> Result<PropertyValue, FormulaError> {
    Ok(match self {
      Value::Null => PropertyValue::Null,
      Value::Bool(b) => PropertyValue::Bool(b),
      Value::Number(n) => number_to_property(n)?,
      Value::Str(s) => PropertyValue::String(s),
      Value::DateTime(dt) => PropertyValue::String(dt.to_rfc3339()),
      Value::Duration(d) => number_to_property(duration_to_days(d))?,
    })
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "None"),
      Value::Bool(true) => write!(f, "True"),
      Value::Bool(false) => write!(f, "False"),
      Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
      Value::Number(n) => write!(f, "{n}"),
      Value::Str(s) => write!(f, "{s}"),
      Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
      Value::Duration(d) => write!(f, "{} days", duration_to_days(*d)),
    }
  }
}

fn number_to_property(n: f64) -> Result<PropertyValue, FormulaError> {
  serde_json::Number::from_f64(n)
    .map(PropertyValue::Number)
    .ok_or_else(|| FormulaError::OutOfRange(n.to_string()))
}

pub(crate) fn duration_to_days(d: TimeDelta) -> f64 {
  d.num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// `days(n)`: a duration of `n` (possibly fractional) days, millisecond precision.
pub(crate) fn days_to_duration(days: f64) -> Result<TimeDelta, FormulaError> {
  let millis = (days * MILLIS_PER_DAY).round();
  if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
    return Err(FormulaError::OutOfRange(format!("days({days})")));
  }
  TimeDelta::try_milliseconds(millis as i64)
    .ok_or_else(|| FormulaError::OutOfRange(format!("days({days})")))
}

/// Parses ISO 8601 text: RFC 3339 with `Z` or an offset, a naive datetime
/// (taken as UTC), or a plain date (midnight UTC).
pub(crate) fn parse_iso_datetime(text: &str) -> Result<DateTime<FixedOffset>, FormulaError> {
  let s = text.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt);
  }
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
    return Ok(dt);
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Ok(naive.and_utc().fixed_offset());
    }
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    if let Some(naive) = date.and_hms_opt(0, 0, 0) {
      return Ok(naive.and_utc().fixed_offset());
    }
  }
  Err(FormulaError::InvalidDate(text.to_string()))
}
