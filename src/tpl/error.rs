//! Error types for compilation and binding

use thiserror::Error;

use crate::error::{format_parse_errors, ParseError};

/// Errors raised while turning markup into a [`TplNode`](super::TplNode) tree
#[derive(Debug, Error)]
pub enum CompileError {
    /// An attribute value or fetched body did not parse
    #[error("syntax error in {plugin}: {}", format_parse_errors(.errors))]
    Syntax {
        plugin: String,
        errors: Vec<ParseError>,
    },

    /// A plugin was triggered without an argument it requires
    #[error("plugin {plugin} requires argument '{argument}'")]
    MissingArgument { plugin: String, argument: String },

    /// An argument was present but unusable
    #[error("invalid argument '{argument}' for plugin {plugin}: {reason}")]
    InvalidArgument {
        plugin: String,
        argument: String,
        reason: String,
    },
}

impl CompileError {
    pub fn syntax(plugin: impl Into<String>, errors: Vec<ParseError>) -> Self {
        Self::Syntax {
            plugin: plugin.into(),
            errors,
        }
    }

    pub fn missing(plugin: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            plugin: plugin.into(),
            argument: argument.into(),
        }
    }

    pub fn invalid(
        plugin: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            plugin: plugin.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while binding a tree to a context or refreshing it
#[derive(Debug, Error)]
pub enum BindError {
    /// An include referenced a name absent from the template cache chain
    #[error("unknown template reference '{name}'")]
    UnknownTemplate { name: String },

    /// A context was built from something other than an object
    #[error("context data must be an object, found {found}")]
    InvalidContext { found: &'static str },
}

impl BindError {
    pub fn unknown_template(name: impl Into<String>) -> Self {
        Self::UnknownTemplate { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_template_display() {
        let err = BindError::unknown_template("missing");
        assert_eq!(err.to_string(), "unknown template reference 'missing'");
    }

    #[test]
    fn test_syntax_display_joins_errors() {
        let err = CompileError::syntax(
            "If",
            vec![ParseError::syntax(0..1, "bad"), ParseError::syntax(2..3, "worse")],
        );
        let text = err.to_string();
        assert!(text.contains("If"));
        assert!(text.contains("bad"));
        assert!(text.contains("worse"));
    }
}
