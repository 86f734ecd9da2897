//! Syntax tree of a parsed formula.

use super::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eq,
  NotEq,
  Lt,
  Le,
  Gt,
  Ge,
}

impl CompareOp {
  pub fn symbol(self) -> &'static str {
    match self {
      CompareOp::Eq => "==",
      CompareOp::NotEq => "!=",
      CompareOp::Lt => "<",
      CompareOp::Le => "<=",
      CompareOp::Gt => ">",
      CompareOp::Ge => ">=",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
  And,
  Or,
}

/// Functions callable from a formula. Nothing else is in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
  Max,
  Min,
  Abs,
  Round,
  DateFromIso,
  Days,
  Iso,
  Str,
  Float,
  Int,
  Bool,
  Strip,
}

impl Builtin {
  pub fn lookup(name: &str) -> Option<Self> {
    Some(match name {
      "max" => Builtin::Max,
      "min" => Builtin::Min,
      "abs" => Builtin::Abs,
      "round" => Builtin::Round,
      "date_from_iso" => Builtin::DateFromIso,
      "days" => Builtin::Days,
      "iso" => Builtin::Iso,
      "str" => Builtin::Str,
      "float" => Builtin::Float,
      "int" => Builtin::Int,
      "bool" => Builtin::Bool,
      "strip" => Builtin::Strip,
      _ => return None,
    })
  }

  pub fn name(self) -> &'static str {
    match self {
      Builtin::Max => "max",
      Builtin::Min => "min",
      Builtin::Abs => "abs",
      Builtin::Round => "round",
      Builtin::DateFromIso => "date_from_iso",
      Builtin::Days => "days",
      Builtin::Iso => "iso",
      Builtin::Str => "str",
      Builtin::Float => "float",
      Builtin::Int => "int",
      Builtin::Bool => "bool",
      Builtin::Strip => "strip",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Literal(Value),
  Var(String),
  Unary {
    op: UnaryOp,
    operand: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  Logical {
    op: LogicalOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  /// Chained comparison `a < b <= c`, meaning `a < b and b <= c`.
  Compare {
    first: Box<Expr>,
    rest: Vec<(CompareOp, Expr)>,
  },
  /// `then_branch if cond else else_branch`.
  Conditional {
    cond: Box<Expr>,
    then_branch: Box<Expr>,
    else_branch: Box<Expr>,
  },
  Call {
    function: Builtin,
    args: Vec<Expr>,
  },
}

impl Expr {
  /// Collects every variable name referenced by the expression.
  pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<String>) {
    match self {
      Expr::Literal(_) => {}
      Expr::Var(name) => {
        out.insert(name.clone());
      }
      Expr::Unary { operand, .. } => operand.collect_variables(out),
      Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
        left.collect_variables(out);
        right.collect_variables(out);
      }
      Expr::Compare { first, rest } => {
        first.collect_variables(out);
        for (_, e) in rest {
          e.collect_variables(out);
        }
      }
      Expr::Conditional {
        cond,
        then_branch,
        else_branch,
      } => {
        cond.collect_variables(out);
        then_branch.collect_variables(out);
        else_branch.collect_variables(out);
      }
      Expr::Call { args, .. } => {
        for a in args {
          a.collect_variables(out);
        }
      }
    }
  }
}
