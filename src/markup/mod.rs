//! Markup tree, lexer and parser
//!
//! The accepted syntax is a well-formed HTML subset: every element is either
//! self-closing (`<br/>`) or explicitly closed, attribute values may be
//! double-quoted, single-quoted, unquoted or absent, and comments are
//! dropped.

pub mod ast;
mod grammar;
pub mod lexer;
mod node;

pub use ast::Attribute;
pub use node::{fragment_html, Node, NodeId, NodeKind};

use crate::error::ParseError;

/// Parse markup into a document node holding the top-level nodes
pub fn parse(source: &str) -> Result<Node, Vec<ParseError>> {
    let items = grammar::parse_items(source)?;
    Ok(Node::from_items(items))
}
