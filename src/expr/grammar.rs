//! Expression grammar using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use serde_json::Value;

use crate::error::ParseError;
use crate::expr::lexer::Token;
use crate::expr::{CompareOp, Expr};

/// Parse a binding expression
pub fn parse(input: &str) -> Result<Expr, Vec<ParseError>> {
    let len = input.len();

    let token_iter = crate::expr::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Number(n) => Expr::Literal(number_value(n)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
        };

        let identifier = select! {
            Token::Ident(s) => s,
        };

        let path = identifier
            .separated_by(just(Token::Dot))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(Expr::Path);

        let atom = choice((
            literal,
            path,
            expr.delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        // `!x`, `not x`, `!!x`
        let unary = choice((just(Token::Bang), just(Token::Not)))
            .repeated()
            .collect::<Vec<_>>()
            .then(atom)
            .map(|(negations, inner)| {
                negations
                    .iter()
                    .fold(inner, |acc, _| Expr::Not(Box::new(acc)))
            });

        let op = choice((
            just(Token::EqEq).to(CompareOp::Eq),
            just(Token::NotEq).to(CompareOp::Ne),
        ));

        unary
            .clone()
            .then(op.then(unary).or_not())
            .map(|(left, rhs)| match rhs {
                Some((op, right)) => Expr::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                None => left,
            })
    })
}
