//! Markup grammar using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::markup::ast::{Attribute, Item};
use crate::markup::lexer::Token;

/// Parse markup source into a list of top-level items
pub fn parse_items(input: &str) -> Result<Vec<Item>, Vec<ParseError>> {
    let len = input.len();

    let token_iter = crate::markup::lexer::lex(input)
        .into_iter()
        .map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    markup_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn markup_parser<'a, I>() -> impl Parser<'a, I, Vec<Item>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let word = select! {
        Token::Word(w) => w,
    };

    let value = select! {
        Token::Word(w) => w,
        Token::Quoted(q) => q,
    };

    let attribute = word
        .clone()
        .then(just(Token::Equals).ignore_then(value).or_not())
        .map(|(name, value)| Attribute::new(name, value.unwrap_or_default()));

    let attributes = attribute.repeated().collect::<Vec<_>>();

    let text = select! {
        Token::Text(t) => Item::Text(t),
    };

    let item = recursive(|item| {
        let open_tag = just(Token::OpenStart)
            .ignore_then(word.clone())
            .then(attributes.clone());

        // <tag a="b"/>
        let self_closing = open_tag
            .clone()
            .then_ignore(just(Token::SelfClose))
            .map_with(|(tag, attributes), e| Item::Element {
                tag,
                attributes,
                children: Vec::new(),
                span: span_range(&e.span()),
            });

        // <tag a="b">...</tag>
        let with_children = open_tag
            .then_ignore(just(Token::TagEnd))
            .then(item.repeated().collect::<Vec<_>>())
            .then(
                just(Token::CloseStart)
                    .ignore_then(word.clone())
                    .then_ignore(just(Token::TagEnd)),
            )
            .try_map(|(((tag, attributes), children), close), span| {
                if close.eq_ignore_ascii_case(&tag) {
                    Ok(Item::Element {
                        tag,
                        attributes,
                        children,
                        span: span_range(&span),
                    })
                } else {
                    Err(Rich::custom(
                        span,
                        format!("mismatched closing tag </{}> for <{}>", close, tag),
                    ))
                }
            });

        choice((self_closing, with_children, text))
    });

    item.repeated().collect::<Vec<_>>().then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements() {
        let items = parse_items(r#"<ul><li class="x">a</li><li>b</li></ul>"#).expect("Should parse");
        assert_eq!(items.len(), 1);
        match &items[0] {
            Item::Element { tag, children, .. } => {
                assert_eq!(tag, "ul");
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_valueless_attribute() {
        let items = parse_items("<input disabled/>").expect("Should parse");
        match &items[0] {
            Item::Element { attributes, .. } => {
                assert_eq!(attributes, &vec![Attribute::new("disabled", "")]);
            }
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_close_tag() {
        let result = parse_items("<div></span>");
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors[0].to_string().contains("mismatched closing tag"));
    }

    #[test]
    fn test_unterminated_attribute_value() {
        assert!(parse_items(r#"<p a="x>y</p>"#).is_err());
        assert!(parse_items("<p a=x/y></p>").is_err());
    }

    #[test]
    fn test_unclosed_element() {
        assert!(parse_items("<div><p>text</div>").is_err());
    }

    #[test]
    fn test_top_level_text_and_elements() {
        let items = parse_items("hello <b>world</b>!").expect("Should parse");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Item::Text("hello ".to_string()));
    }
}
