//! Recursive-descent parser for the formula language.
//!
//! Precedence, lowest first: `x if c else y`, `or`, `and`, `not`,
//! comparisons (chainable), `+ -`, `* / %`, unary `-`, calls and atoms.

use super::ast::{BinaryOp, Builtin, CompareOp, Expr, LogicalOp, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};
use super::{FormulaError, Value};

/// Maximum nesting of parentheses, calls and unary operators. Every operator
/// in an `or`/`and`/`+ -`/`* / %` chain also counts as one level, since the
/// chain becomes a left-deep tree.
const MAX_DEPTH: usize = 128;

/// Parses formula source into an expression tree.
pub fn parse(source: &str) -> Result<Expr, FormulaError> {
  let tokens = tokenize(source)?;
  let mut parser = Parser {
    tokens,
    index: 0,
    depth: 0,
  };
  let expr = parser.conditional()?;
  let tail = parser.peek();
  if tail.kind != TokenKind::Eof {
    return Err(FormulaError::UnexpectedToken {
      expected: "end of formula",
      found: tail.kind.describe(),
      pos: tail.pos,
    });
  }
  Ok(expr)
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
  Expr::Logical {
    op,
    left: Box::new(left),
    right: Box::new(right),
  }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
  Expr::Binary {
    op,
    left: Box::new(left),
    right: Box::new(right),
  }
}

struct Parser {
  tokens: Vec<Token>,
  index: usize,
  depth: usize,
}

impl Parser {
  fn peek(&self) -> &Token {
    // tokenize always ends with Eof, and the index never moves past it.
    &self.tokens[self.index.min(self.tokens.len() - 1)]
  }

  fn advance(&mut self) -> Token {
    let token = self.peek().clone();
    if token.kind != TokenKind::Eof {
      self.index += 1;
    }
    token
  }

  fn eat(&mut self, kind: &TokenKind) -> bool {
    if &self.peek().kind == kind {
      self.advance();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), FormulaError> {
    if self.eat(kind) {
      return Ok(());
    }
    let found = self.peek();
    Err(FormulaError::UnexpectedToken {
      expected,
      found: found.kind.describe(),
      pos: found.pos,
    })
  }

  fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, FormulaError>) -> Result<T, FormulaError> {
    if self.depth >= MAX_DEPTH {
      return Err(FormulaError::TooDeep { pos: self.peek().pos });
    }
    self.depth += 1;
    let out = f(self);
    self.depth -= 1;
    out
  }

  fn conditional(&mut self) -> Result<Expr, FormulaError> {
    self.nested(|p| {
      let then_branch = p.or_expr()?;
      if !p.eat(&TokenKind::If) {
        return Ok(then_branch);
      }
      let cond = p.or_expr()?;
      p.expect(&TokenKind::Else, "'else'")?;
      let else_branch = p.conditional()?;
      Ok(Expr::Conditional {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
      })
    })
  }

  /// Parses `operand (op operand)*` into a left-deep tree, charging one
  /// level of the depth budget per operator.
  fn chain<Op: Copy>(
    &mut self,
    operand: fn(&mut Self) -> Result<Expr, FormulaError>,
    op_of: fn(&TokenKind) -> Option<Op>,
    build: fn(Op, Expr, Expr) -> Expr,
  ) -> Result<Expr, FormulaError> {
    let start = self.depth;
    let out = self.chain_links(operand, op_of, build);
    self.depth = start;
    out
  }

  fn chain_links<Op: Copy>(
    &mut self,
    operand: fn(&mut Self) -> Result<Expr, FormulaError>,
    op_of: fn(&TokenKind) -> Option<Op>,
    build: fn(Op, Expr, Expr) -> Expr,
  ) -> Result<Expr, FormulaError> {
    let mut left = operand(self)?;
    while let Some(op) = op_of(&self.peek().kind) {
      if self.depth >= MAX_DEPTH {
        return Err(FormulaError::TooDeep { pos: self.peek().pos });
      }
      self.depth += 1;
      self.advance();
      let right = operand(self)?;
      left = build(op, left, right);
    }
    Ok(left)
  }

  fn or_expr(&mut self) -> Result<Expr, FormulaError> {
    self.chain(
      Self::and_expr,
      |kind| (*kind == TokenKind::Or).then_some(LogicalOp::Or),
      logical,
    )
  }

  fn and_expr(&mut self) -> Result<Expr, FormulaError> {
    self.chain(
      Self::not_expr,
      |kind| (*kind == TokenKind::And).then_some(LogicalOp::And),
      logical,
    )
  }

  fn not_expr(&mut self) -> Result<Expr, FormulaError> {
    if self.eat(&TokenKind::Not) {
      let operand = self.nested(Self::not_expr)?;
      return Ok(Expr::Unary {
        op: UnaryOp::Not,
        operand: Box::new(operand),
      });
    }
    self.comparison()
  }

  fn comparison(&mut self) -> Result<Expr, FormulaError> {
    let first = self.additive()?;
    let mut rest = Vec::new();
    loop {
      let op = match self.peek().kind {
        TokenKind::EqEq => CompareOp::Eq,
        TokenKind::NotEq => CompareOp::NotEq,
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::Le => CompareOp::Le,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::Ge => CompareOp::Ge,
        _ => break,
      };
      self.advance();
      rest.push((op, self.additive()?));
    }
    if rest.is_empty() {
      Ok(first)
    } else {
      Ok(Expr::Compare {
        first: Box::new(first),
        rest,
      })
    }
  }

  fn additive(&mut self) -> Result<Expr, FormulaError> {
    self.chain(
      Self::term,
      |kind| match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
      },
      binary,
    )
  }

  fn term(&mut self) -> Result<Expr, FormulaError> {
    self.chain(
      Self::unary,
      |kind| match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        _ => None,
      },
      binary,
    )
  }

  fn unary(&mut self) -> Result<Expr, FormulaError> {
    if self.eat(&TokenKind::Minus) {
      let operand = self.nested(Self::unary)?;
      return Ok(Expr::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(operand),
      });
    }
    if self.eat(&TokenKind::Plus) {
      return self.nested(Self::unary);
    }
    self.primary()
  }

  fn primary(&mut self) -> Result<Expr, FormulaError> {
    let token = self.advance();
    match token.kind {
      TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
      TokenKind::Str(s) => Ok(Expr::Literal(Value::Str(s))),
      TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
      TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
      TokenKind::None => Ok(Expr::Literal(Value::Null)),
      TokenKind::LParen => {
        let inner = self.conditional()?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(inner)
      }
      TokenKind::Ident(name) => {
        if self.peek().kind != TokenKind::LParen {
          return Ok(Expr::Var(name));
        }
        let function = Builtin::lookup(&name).ok_or(FormulaError::UnknownFunction {
          name,
          pos: token.pos,
        })?;
        self.advance();
        let args = self.nested(Self::arguments)?;
        Ok(Expr::Call { function, args })
      }
      other => Err(FormulaError::UnexpectedToken {
        expected: "expression",
        found: other.describe(),
        pos: token.pos,
      }),
    }
  }

  /// Comma-separated arguments after `(`, consuming the closing `)`.
  fn arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
    let mut args = Vec::new();
    if self.eat(&TokenKind::RParen) {
      return Ok(args);
    }
    loop {
      args.push(self.conditional()?);
      if self.eat(&TokenKind::Comma) {
        continue;
      }
      self.expect(&TokenKind::RParen, "',' or ')'")?;
      return Ok(args);
    }
  }
}
