//! Syntax tree produced by the markup grammar

use crate::error::Span;

/// A single `name="value"` pair; valueless attributes carry an empty value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parsed markup item
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<Item>,
        span: Span,
    },
    Text(String),
}
