//! Expression tree over decimal operands

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use bigdecimal::BigDecimal;

/// Arithmetic operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Comparison operators - evaluate to `1` or `0`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    pub fn holds(&self, left: &BigDecimal, right: &BigDecimal) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        }
    }
}

/// Decimal expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Already-parsed value
    Number(BigDecimal),
    /// Raw text, sanitized and parsed at evaluation time
    Operand(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Sqrt(Box<Expr>),
    /// Round toward negative infinity to an integer
    Floor(Box<Expr>),
}

impl Expr {
    pub fn num(value: impl Into<BigDecimal>) -> Self {
        Expr::Number(value.into())
    }

    pub fn operand(raw: impl Into<String>) -> Self {
        Expr::Operand(raw.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(self, op: CompareOp, other: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn sqrt(self) -> Self {
        Expr::Sqrt(Box::new(self))
    }

    pub fn floor(self) -> Self {
        Expr::Floor(Box::new(self))
    }

    /// Parse `bc`-style infix text
    pub fn parse(text: &str) -> gravtime_core::EvalResult<Self> {
        crate::parser::parse_expr(text)
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Operand(_) => 1,
            Expr::Neg(inner) | Expr::Sqrt(inner) | Expr::Floor(inner) => 1 + inner.size(),
            Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
                1 + left.size() + right.size()
            }
        }
    }
}

impl From<BigDecimal> for Expr {
    fn from(value: BigDecimal) -> Self {
        Expr::Number(value)
    }
}

impl From<&BigDecimal> for Expr {
    fn from(value: &BigDecimal) -> Self {
        Expr::Number(value.clone())
    }
}

impl From<u64> for Expr {
    fn from(value: u64) -> Self {
        Expr::Number(BigDecimal::from(value))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

/// Fully parenthesized, re-parseable rendering
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => {
                let text = v.to_plain_string();
                match text.strip_prefix('-') {
                    Some(abs) => write!(f, "(-{})", abs),
                    None => f.write_str(&text),
                }
            }
            Expr::Operand(raw) => f.write_str(raw),
            Expr::Neg(inner) => write!(f, "(-{})", inner),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Compare { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Sqrt(inner) => write!(f, "sqrt({})", inner),
            Expr::Floor(inner) => write!(f, "floor({})", inner),
        }
    }
}
