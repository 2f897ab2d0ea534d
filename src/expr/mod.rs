//! Binding expressions
//!
//! A deliberately small language: dotted paths (`person.name`), string,
//! number, boolean and null literals, negation (`!`, `not`), equality
//! (`==`, `!=`) and parentheses. Missing paths evaluate to `null`.

mod grammar;
mod interpolation;
pub mod lexer;

pub use interpolation::{Interpolation, Segment};

use serde_json::Value;

use crate::context::Context;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Vec<String>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr, Vec<ParseError>> {
        grammar::parse(source)
    }

    /// The path segments when the expression is a bare path
    pub fn as_path(&self) -> Option<&[String]> {
        match self {
            Expr::Path(segments) => Some(segments),
            _ => None,
        }
    }

    /// Evaluate against a context
    pub fn eval(&self, ctx: &Context) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Path(segments) => ctx.lookup(segments).unwrap_or(Value::Null),
            Expr::Not(inner) => Value::Bool(!is_truthy(&inner.eval(ctx))),
            Expr::Compare { op, left, right } => {
                let equal = left.eval(ctx) == right.eval(ctx);
                Value::Bool(match op {
                    CompareOp::Eq => equal,
                    CompareOp::Ne => !equal,
                })
            }
        }
    }
}

/// Truthiness used by conditionals
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text rendering of a value: strings verbatim, null as nothing
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
