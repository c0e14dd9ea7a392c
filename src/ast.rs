use crate::types::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    /// `target.name` or `target[property]`.
    Member { target: Box<Expr>, property: Box<Expr> },
    Unary(UnaryOp, Box<Expr>),
    Binary { op: String, left: Box<Expr>, right: Box<Expr> },
    Conditional { test: Box<Expr>, consequent: Box<Expr>, alternate: Box<Expr> },
    Transform(Transform),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

/// `subject|name(args...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub name: String,
    pub subject: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

impl Expr {
    pub fn binary(op: impl Into<String>, left: Expr, right: Expr) -> Self {
        Expr::Binary { op: op.into(), left: Box::new(left), right: Box::new(right) }
    }

    /// The value of a literal, or of an array/object literal built only from
    /// literals. Anything that needs a context to evaluate yields `None`.
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Expr::Literal(v) => Some(v.clone()),
            Expr::Array(items) => items
                .iter()
                .map(Expr::literal_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(entries) => entries
                .iter()
                .map(|(k, v)| v.literal_value().map(|v| (k.clone(), v)))
                .collect::<Option<Map>>()
                .map(Value::Object),
            _ => None,
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, Expr::Binary { .. } | Expr::Conditional { .. } | Expr::Unary(..))
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.needs_parens() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Renders the expression back to source text. Used in analyzer findings.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Member { target, property } => match property.as_ref() {
                Expr::Literal(Value::String(name)) if is_plain_identifier(name) => {
                    write!(f, "{}.{}", Operand(target), name)
                }
                other => write!(f, "{}[{}]", Operand(target), other),
            },
            Expr::Unary(UnaryOp::Not, e) => write!(f, "!{}", Operand(e)),
            Expr::Unary(UnaryOp::Minus, e) => write!(f, "-{}", Operand(e)),
            Expr::Binary { op, left, right } => {
                write!(f, "{} {} {}", Operand(left), op, Operand(right))
            }
            Expr::Conditional { test, consequent, alternate } => {
                write!(f, "{} ? {} : {}", Operand(test), consequent, alternate)
            }
            Expr::Transform(t) => write!(f, "{}", t),
            Expr::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", Value::String(key.clone()), value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", Operand(&self.subject), self.name)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
