//! `{{ expression }}` interpolation in text and attribute values

use crate::context::Context;
use crate::error::ParseError;
use crate::expr::{display_value, Expr};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expr),
}

/// A string split into literal and expression segments
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    segments: Vec<Segment>,
}

impl Interpolation {
    pub fn parse(source: &str) -> Result<Self, Vec<ParseError>> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let body_start = start + 2;
            let Some(len) = rest[body_start..].find("}}") else {
                return Err(vec![ParseError::syntax(
                    offset + start..offset + rest.len(),
                    "unterminated '{{' in interpolation",
                )]);
            };
            let body = &rest[body_start..body_start + len];
            let expr = Expr::parse(body.trim()).map_err(|errs| {
                errs.into_iter()
                    .map(|e| {
                        let span = e.span();
                        ParseError::syntax(
                            offset + body_start + span.start..offset + body_start + span.end,
                            e.to_string(),
                        )
                    })
                    .collect::<Vec<_>>()
            })?;
            segments.push(Segment::Expr(expr));

            let consumed = body_start + len + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// True when there is nothing to evaluate
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn render(&self, ctx: &Context) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Expr(expr) => display_value(&expr.eval(ctx)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_text() {
        let interp = Interpolation::parse("plain text").expect("Should parse");
        assert!(interp.is_static());
        assert_eq!(interp.render(&Context::new()), "plain text");
    }

    #[test]
    fn test_render_segments() {
        let ctx = Context::from_value(json!({ "country": "Czech republic" })).expect("object");
        let interp = Interpolation::parse("Greetings from the {{ country }}!").expect("Should parse");
        assert!(!interp.is_static());
        assert_eq!(interp.segments().len(), 3);
        assert_eq!(interp.render(&ctx), "Greetings from the Czech republic!");
    }

    #[test]
    fn test_unterminated() {
        assert!(Interpolation::parse("a {{ b").is_err());
    }

    #[test]
    fn test_bad_expression() {
        let errs = Interpolation::parse("x {{ a b }}").expect_err("Should fail");
        assert!(errs[0].span().start >= 4);
    }
}
