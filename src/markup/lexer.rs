//! Lexer for template markup using logos
//!
//! Markup is modal: outside a tag everything up to the next `<` is text,
//! inside a tag we have names, `=`, and quoted values. Two logos lexers are
//! chained with `morph` and their output is flattened into a single [`Token`]
//! stream for the grammar.

use std::fmt;

use logos::Logos;

use crate::error::Span;

/// Tokens seen between tags
#[derive(Logos, Debug, Clone, PartialEq)]
enum ContentToken {
    #[token("</")]
    CloseStart,
    #[token("<")]
    OpenStart,

    #[regex(r"<!--[^>]*-->", logos::skip)]
    Comment,

    #[regex(r"[^<]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Tokens seen inside a tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum TagToken {
    #[token(">")]
    TagEnd,
    #[token("/>")]
    SelfClose,
    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Quoted(String),

    #[regex(r#"[^ \t\n\r"'=<>/]+"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Flattened markup token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Character data between tags, entities decoded
    Text(String),
    /// `<`
    OpenStart,
    /// `</`
    CloseStart,
    /// `>`
    TagEnd,
    /// `/>`
    SelfClose,
    /// `=`
    Equals,
    /// Tag name, attribute name or unquoted attribute value
    Word(String),
    /// Quoted attribute value, entities decoded
    Quoted(String),
    /// Characters inside a tag that no rule matched
    Invalid(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(t) => write!(f, "text {:?}", t),
            Token::OpenStart => write!(f, "'<'"),
            Token::CloseStart => write!(f, "'</'"),
            Token::TagEnd => write!(f, "'>'"),
            Token::SelfClose => write!(f, "'/>'"),
            Token::Equals => write!(f, "'='"),
            Token::Word(w) => write!(f, "name '{}'", w),
            Token::Quoted(q) => write!(f, "string \"{}\"", q),
            Token::Invalid(s) => write!(f, "unexpected characters '{}'", s),
        }
    }
}

/// Lex markup into tokens with spans
pub fn lex(input: &str) -> Vec<(Token, Span)> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(input);

    while let Some(tok) = content.next() {
        let span = content.span();
        match tok {
            Ok(ContentToken::Text(text)) => tokens.push((Token::Text(decode_entities(&text)), span)),
            Ok(ContentToken::OpenStart) | Ok(ContentToken::CloseStart) => {
                let open = if matches!(tok, Ok(ContentToken::OpenStart)) {
                    Token::OpenStart
                } else {
                    Token::CloseStart
                };
                tokens.push((open, span));

                let mut tag = content.morph::<TagToken>();
                while let Some(tok) = tag.next() {
                    let span = tag.span();
                    match tok {
                        Ok(TagToken::TagEnd) => {
                            tokens.push((Token::TagEnd, span));
                            break;
                        }
                        Ok(TagToken::SelfClose) => {
                            tokens.push((Token::SelfClose, span));
                            break;
                        }
                        Ok(TagToken::Equals) => tokens.push((Token::Equals, span)),
                        Ok(TagToken::Quoted(q)) => {
                            tokens.push((Token::Quoted(decode_entities(&q)), span))
                        }
                        Ok(TagToken::Word(w)) => tokens.push((Token::Word(w), span)),
                        Err(_) => {
                            tokens.push((Token::Invalid(tag.slice().to_string()), span))
                        }
                    }
                }
                content = tag.morph();
            }
            Ok(ContentToken::Comment) | Err(_) => {}
        }
    }

    tokens
}

/// Decode the handful of entities the serializer produces
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            kinds(r#"<div class="a">hi</div>"#),
            vec![
                Token::OpenStart,
                Token::Word("div".to_string()),
                Token::Word("class".to_string()),
                Token::Equals,
                Token::Quoted("a".to_string()),
                Token::TagEnd,
                Token::Text("hi".to_string()),
                Token::CloseStart,
                Token::Word("div".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_text_keeps_keywords_and_braces() {
        assert_eq!(
            kinds("for {{ x }} = y"),
            vec![Token::Text("for {{ x }} = y".to_string())]
        );
    }

    #[test]
    fn test_self_closing_and_single_quotes() {
        assert_eq!(
            kinds("<tpl-include name='avatar'/>"),
            vec![
                Token::OpenStart,
                Token::Word("tpl-include".to_string()),
                Token::Word("name".to_string()),
                Token::Equals,
                Token::Quoted("avatar".to_string()),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("<!-- note --><p></p>"),
            vec![
                Token::OpenStart,
                Token::Word("p".to_string()),
                Token::TagEnd,
                Token::CloseStart,
                Token::Word("p".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_stray_tag_characters_are_reported() {
        let tokens = kinds("<p a=x/y>");
        assert!(
            tokens.iter().any(|t| matches!(t, Token::Invalid(s) if s.starts_with('/'))),
            "{:?}",
            tokens
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(decode_entities("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
