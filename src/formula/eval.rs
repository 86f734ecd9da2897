//! Tree-walking evaluator over a fixed set of bound variables.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::ast::{BinaryOp, Builtin, CompareOp, Expr, LogicalOp, UnaryOp};
use super::value::{days_to_duration, duration_to_days, parse_iso_datetime};
use super::{FormulaError, Value};

/// Variables visible to a formula.
pub type Bindings = BTreeMap<String, Value>;

/// Evaluates `expr` with only `env` and the builtins in scope.
pub fn evaluate(expr: &Expr, env: &Bindings) -> Result<Value, FormulaError> {
  match expr {
    Expr::Literal(v) => Ok(v.clone()),
    Expr::Var(name) => env
      .get(name)
      .cloned()
      .ok_or_else(|| FormulaError::UnknownName(name.clone())),
    Expr::Unary { op, operand } => {
      let v = evaluate(operand, env)?;
      match op {
        UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
        UnaryOp::Neg => match v {
          Value::Duration(d) => Ok(Value::Duration(-d)),
          other => other
            .as_number()
            .map(|n| Value::Number(-n))
            .ok_or_else(|| FormulaError::type_error("unary -", &[other.kind()])),
        },
      }
    }
    Expr::Logical { op, left, right } => {
      let l = evaluate(left, env)?;
      let decided = match op {
        LogicalOp::And => !l.is_truthy(),
        LogicalOp::Or => l.is_truthy(),
      };
      if decided { Ok(l) } else { evaluate(right, env) }
    }
    Expr::Binary { op, left, right } => {
      let l = evaluate(left, env)?;
      let r = evaluate(right, env)?;
      binary(*op, l, r)
    }
    Expr::Compare { first, rest } => {
      let mut left = evaluate(first, env)?;
      for (op, next) in rest {
        let right = evaluate(next, env)?;
        if !compare(*op, &left, &right)? {
          return Ok(Value::Bool(false));
        }
        left = right;
      }
      Ok(Value::Bool(true))
    }
    Expr::Conditional {
      cond,
      then_branch,
      else_branch,
    } => {
      if evaluate(cond, env)?.is_truthy() {
        evaluate(then_branch, env)
      } else {
        evaluate(else_branch, env)
      }
    }
    Expr::Call { function, args } => {
      let values = args
        .iter()
        .map(|a| evaluate(a, env))
        .collect::<Result<Vec<_>, _>>()?;
      call(*function, values)
    }
  }
}

fn compare(op: CompareOp, l: &Value, r: &Value) -> Result<bool, FormulaError> {
  Ok(match op {
    CompareOp::Eq => l.loose_eq(r),
    CompareOp::NotEq => !l.loose_eq(r),
    CompareOp::Lt => l.try_cmp(r, op.symbol())? == Ordering::Less,
    CompareOp::Le => l.try_cmp(r, op.symbol())? != Ordering::Greater,
    CompareOp::Gt => l.try_cmp(r, op.symbol())? == Ordering::Greater,
    CompareOp::Ge => l.try_cmp(r, op.symbol())? != Ordering::Less,
  })
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, FormulaError> {
  let overflow = || FormulaError::OutOfRange(format!("datetime {}", op.symbol()));
  match (op, &l, &r) {
    (BinaryOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
    (BinaryOp::Add, Value::DateTime(dt), Value::Duration(d))
    | (BinaryOp::Add, Value::Duration(d), Value::DateTime(dt)) => {
      return dt.checked_add_signed(*d).map(Value::DateTime).ok_or_else(overflow);
    }
    (BinaryOp::Sub, Value::DateTime(dt), Value::Duration(d)) => {
      return dt.checked_sub_signed(*d).map(Value::DateTime).ok_or_else(overflow);
    }
    (BinaryOp::Sub, Value::DateTime(a), Value::DateTime(b)) => {
      return Ok(Value::Duration(a.signed_duration_since(*b)));
    }
    (BinaryOp::Add, Value::Duration(a), Value::Duration(b)) => {
      return a.checked_add(b).map(Value::Duration).ok_or_else(overflow);
    }
    (BinaryOp::Sub, Value::Duration(a), Value::Duration(b)) => {
      return a.checked_sub(b).map(Value::Duration).ok_or_else(overflow);
    }
    (BinaryOp::Mul, Value::Duration(d), n) | (BinaryOp::Mul, n, Value::Duration(d))
      if n.as_number().is_some() =>
    {
      let factor = n.as_number().unwrap_or_default();
      return days_to_duration(duration_to_days(*d) * factor).map(Value::Duration);
    }
    _ => {}
  }

  let (Some(a), Some(b)) = (l.as_number(), r.as_number()) else {
    return Err(FormulaError::type_error(op.symbol(), &[l.kind(), r.kind()]));
  };
  let n = match op {
    BinaryOp::Add => a + b,
    BinaryOp::Sub => a - b,
    BinaryOp::Mul => a * b,
    BinaryOp::Div => {
      if b == 0.0 {
        return Err(FormulaError::DivisionByZero);
      }
      a / b
    }
    BinaryOp::Mod => {
      if b == 0.0 {
        return Err(FormulaError::DivisionByZero);
      }
      // Result takes the sign of the divisor.
      a - b * (a / b).floor()
    }
  };
  Ok(Value::Number(n))
}

fn arity(function: Builtin, expected: &'static str, got: usize, ok: bool) -> Result<(), FormulaError> {
  if ok {
    Ok(())
  } else {
    Err(FormulaError::Arity {
      function: function.name(),
      expected,
      got,
    })
  }
}

fn single(function: Builtin, mut args: Vec<Value>) -> Result<Value, FormulaError> {
  let got = args.len();
  arity(function, "1", got, got == 1)?;
  Ok(args.remove(0))
}

fn number_arg(function: Builtin, v: &Value) -> Result<f64, FormulaError> {
  v.as_number()
    .ok_or_else(|| FormulaError::type_error(function.name(), &[v.kind()]))
}

fn call(function: Builtin, args: Vec<Value>) -> Result<Value, FormulaError> {
  match function {
    Builtin::Max | Builtin::Min => {
      arity(function, "at least 1", args.len(), !args.is_empty())?;
      let wanted = if function == Builtin::Max {
        Ordering::Greater
      } else {
        Ordering::Less
      };
      let mut iter = args.into_iter();
      let mut best = iter.next().unwrap_or(Value::Null);
      for candidate in iter {
        if candidate.try_cmp(&best, function.name())? == wanted {
          best = candidate;
        }
      }
      Ok(best)
    }
    Builtin::Abs => match single(function, args)? {
      Value::Duration(d) => Ok(Value::Duration(d.abs())),
      v => Ok(Value::Number(number_arg(function, &v)?.abs())),
    },
    Builtin::Round => {
      let got = args.len();
      arity(function, "1 or 2", got, got == 1 || got == 2)?;
      let x = number_arg(function, &args[0])?;
      let digits = match args.get(1) {
        Some(d) => number_arg(function, d)?,
        None => 0.0,
      };
      let scale = 10f64.powi(digits as i32);
      Ok(Value::Number((x * scale).round_ties_even() / scale))
    }
    Builtin::DateFromIso => match single(function, args)? {
      Value::Str(s) => parse_iso_datetime(&s).map(Value::DateTime),
      dt @ Value::DateTime(_) => Ok(dt),
      other => Err(FormulaError::type_error(function.name(), &[other.kind()])),
    },
    Builtin::Days => {
      let v = single(function, args)?;
      days_to_duration(number_arg(function, &v)?).map(Value::Duration)
    }
    Builtin::Iso => match single(function, args)? {
      Value::DateTime(dt) => Ok(Value::Str(dt.to_rfc3339())),
      Value::Str(s) => parse_iso_datetime(&s).map(|dt| Value::Str(dt.to_rfc3339())),
      other => Err(FormulaError::type_error(function.name(), &[other.kind()])),
    },
    Builtin::Str => Ok(Value::Str(single(function, args)?.to_string())),
    Builtin::Float => match single(function, args)? {
      Value::Str(s) => s
        .trim()
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| FormulaError::InvalidConversion(s)),
      v => Ok(Value::Number(number_arg(function, &v)?)),
    },
    Builtin::Int => match single(function, args)? {
      Value::Str(s) => s
        .trim()
        .parse::<i64>()
        .map(|n| Value::Number(n as f64))
        .map_err(|_| FormulaError::InvalidConversion(s)),
      v => Ok(Value::Number(number_arg(function, &v)?.trunc())),
    },
    Builtin::Bool => Ok(Value::Bool(single(function, args)?.is_truthy())),
    Builtin::Strip => match single(function, args)? {
      Value::Str(s) => Ok(Value::Str(s.trim().to_string())),
      Value::Null => Ok(Value::Str(String::new())),
      other => Err(FormulaError::type_error(function.name(), &[other.kind()])),
    },
  }
}
