//! Lexer for binding expressions using logos

use std::fmt;

use logos::Logos;

use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("not")]
    Not,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("!")]
    Bang,
    #[token(".")]
    Dot,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r"'([^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Str(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Input no rule matched; the grammar never accepts it
    Error,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "keyword 'true'"),
            Token::False => write!(f, "keyword 'false'"),
            Token::Null => write!(f, "keyword 'null'"),
            Token::Not => write!(f, "keyword 'not'"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::Bang => write!(f, "'!'"),
            Token::Dot => write!(f, "'.'"),
            Token::ParenOpen => write!(f, "'('"),
            Token::ParenClose => write!(f, "')'"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Error => write!(f, "unrecognized input"),
        }
    }
}

/// Lex an expression into tokens with spans; unrecognized input becomes
/// [`Token::Error`]
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(Token::Error), span))
}
