//! Syntax errors for markup and expressions

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    /// Build a syntax error without expectations
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let end = span.end.min(source.len());
                let start = span.start.min(end);
                let written = Report::build(ReportKind::Error, filename, start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, start..end))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return self.to_string();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a, T: fmt::Display> From<Rich<'a, T>> for ParseError {
    fn from(err: Rich<'a, T>) -> Self {
        let found = match err.found() {
            Some(tok) => tok.to_string(),
            None => "end of input".to_string(),
        };

        let message = match err.reason() {
            RichReason::Custom(msg) => msg.to_string(),
            _ => format!("Unexpected {}", found),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format!("{}", &**tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        let range = err.span().into_range();
        ParseError::Syntax {
            span: range.start.min(range.end)..range.end.max(range.start),
            message,
            expected,
        }
    }
}

/// Join several syntax errors into one line
pub(crate) fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tolerates_inverted_and_overlong_spans() {
        let source = "role == 'admin";
        for span in [14..7, 3..40] {
            let report = ParseError::syntax(span, "unterminated string").format(source, "expr");
            assert!(report.contains("unterminated string"));
        }
    }

    #[test]
    fn test_format_includes_message() {
        let err = ParseError::syntax(5..8, "mismatched closing tag");
        let report = err.format("<div></span>", "page.html");
        assert!(report.contains("mismatched closing tag"));
    }

    #[test]
    fn test_join_errors() {
        let errors = vec![
            ParseError::syntax(0..1, "first"),
            ParseError::syntax(2..3, "second"),
        ];
        let joined = format_parse_errors(&errors);
        assert!(joined.contains("first"));
        assert!(joined.contains("; "));
        assert!(joined.contains("second"));
    }
}
