use winnow::combinator::{cut_err, delimited, fail, opt, preceded, repeat, separated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::any;

use crate::{
    CompareOp, Condition, Conjunction, Disjunction, Expression, Rule, SpanCheck, Term, Value,
    WhereCondition, WhereFilter, WhereTerm,
};

use super::token::{Token, TokenKind};

// -- Token primitives -------------------------------------------------------

fn peek(input: &[Token<'_>]) -> TokenKind {
    input.first().map_or(TokenKind::Eof, |t| t.kind)
}

fn describe(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

/// Match one token of the given kind.
fn kind<'a>(expected: TokenKind) -> impl FnMut(&mut &[Token<'a>]) -> ModalResult<Token<'a>> {
    move |input: &mut &[Token<'a>]| {
        any.verify(|t: &Token<'a>| t.kind == expected)
            .context(describe(expected.describe()))
            .parse_next(input)
    }
}

/// Fail without consuming, reporting what would have been accepted here.
fn expected<O>(input: &mut &[Token<'_>], what: &'static str) -> ModalResult<O> {
    cut_err(fail).context(describe(what)).parse_next(input)
}

fn operation_name(input: &mut &[Token<'_>]) -> ModalResult<String> {
    match peek(input) {
        TokenKind::Ident => kind(TokenKind::Ident)
            .map(|t| t.lexeme.to_owned())
            .parse_next(input),
        _ => expected(input, "operation name"),
    }
}

/// `( ident )`, shared by `count(..)` and `trace.has(..)`.
fn operation_argument(input: &mut &[Token<'_>]) -> ModalResult<String> {
    delimited(
        cut_err(kind(TokenKind::LParen)),
        cut_err(operation_name),
        cut_err(kind(TokenKind::RParen)),
    )
    .parse_next(input)
}

// -- Operators & literals ---------------------------------------------------

fn compare_op_for(kind: TokenKind) -> Option<CompareOp> {
    Some(match kind {
        TokenKind::Eq => CompareOp::Eq,
        TokenKind::Neq => CompareOp::Neq,
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::Lte => CompareOp::Lte,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::Gte => CompareOp::Gte,
        TokenKind::In => CompareOp::In,
        TokenKind::Matches => CompareOp::Matches,
        TokenKind::Contains => CompareOp::Contains,
        _ => return None,
    })
}

fn compare_op(input: &mut &[Token<'_>]) -> ModalResult<CompareOp> {
    any.verify_map(|t: Token<'_>| compare_op_for(t.kind))
        .context(describe("comparison operator"))
        .parse_next(input)
}

fn number_value(text: &str) -> Option<Value> {
    if text.contains('.') {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    }
}

fn value(input: &mut &[Token<'_>]) -> ModalResult<Value> {
    match peek(input) {
        TokenKind::String => kind(TokenKind::String)
            .map(|t| Value::String(t.lexeme.to_owned()))
            .parse_next(input),
        TokenKind::Number => any
            .verify_map(|t: Token<'_>| number_value(t.lexeme))
            .context(describe("number"))
            .parse_next(input),
        TokenKind::True => kind(TokenKind::True).value(Value::Bool(true)).parse_next(input),
        TokenKind::False => kind(TokenKind::False)
            .value(Value::Bool(false))
            .parse_next(input),
        TokenKind::Ident => kind(TokenKind::Ident)
            .map(|t| Value::Ident(t.lexeme.to_owned()))
            .parse_next(input),
        TokenKind::LBracket => list.map(Value::List).parse_next(input),
        _ => expected(input, "value"),
    }
}

fn list(input: &mut &[Token<'_>]) -> ModalResult<Vec<Value>> {
    delimited(
        kind(TokenKind::LBracket),
        cut_err(separated(1.., value, kind(TokenKind::Comma))),
        cut_err(kind(TokenKind::RBracket)),
    )
    .parse_next(input)
}

// -- Expressions (right-hand side of comparisons) ---------------------------

fn count_expr(input: &mut &[Token<'_>]) -> ModalResult<String> {
    preceded(kind(TokenKind::Count), operation_argument).parse_next(input)
}

fn trace_prefix(input: &mut &[Token<'_>]) -> ModalResult<()> {
    (kind(TokenKind::Trace), cut_err(kind(TokenKind::Dot)))
        .void()
        .parse_next(input)
}

fn expression(input: &mut &[Token<'_>]) -> ModalResult<Expression> {
    match peek(input) {
        TokenKind::Count => count_expr.map(Expression::Count).parse_next(input),
        TokenKind::Trace => {
            trace_prefix.parse_next(input)?;
            match peek(input) {
                TokenKind::Count => count_expr.map(Expression::Count).parse_next(input),
                _ => expected(input, "'count'"),
            }
        }
        TokenKind::Ident if input[0].lexeme.contains('.') => kind(TokenKind::Ident)
            .map(|t| Expression::Path(t.lexeme.to_owned()))
            .parse_next(input),
        _ => value.map(Expression::Value).parse_next(input),
    }
}

// -- Where conditions -------------------------------------------------------

fn attribute_name(input: &mut &[Token<'_>]) -> ModalResult<String> {
    match peek(input) {
        TokenKind::Ident | TokenKind::String => any
            .map(|t: Token<'_>| t.lexeme.to_owned())
            .parse_next(input),
        _ => expected(input, "attribute name"),
    }
}

fn where_filter(input: &mut &[Token<'_>]) -> ModalResult<WhereFilter> {
    let attribute = attribute_name.parse_next(input)?;
    if compare_op_for(peek(input)).is_none() {
        return Ok(WhereFilter::Flag(attribute));
    }
    let op = compare_op.parse_next(input)?;
    let rhs = cut_err(expression).parse_next(input)?;
    Ok(WhereFilter::Compare { attribute, op, rhs })
}

fn positive_where_term(input: &mut &[Token<'_>]) -> ModalResult<WhereTerm> {
    match peek(input) {
        TokenKind::LParen => delimited(
            kind(TokenKind::LParen),
            cut_err(where_condition),
            cut_err(kind(TokenKind::RParen)),
        )
        .map(WhereTerm::Grouped)
        .parse_next(input),
        TokenKind::Ident | TokenKind::String => {
            where_filter.map(WhereTerm::Filter).parse_next(input)
        }
        _ => expected(input, "attribute filter or '('"),
    }
}

fn where_term(input: &mut &[Token<'_>]) -> ModalResult<WhereTerm> {
    if opt(kind(TokenKind::Not)).parse_next(input)?.is_some() {
        let inner = positive_where_term.parse_next(input)?;
        return Ok(WhereTerm::Not(Box::new(inner)));
    }
    positive_where_term.parse_next(input)
}

fn where_condition(input: &mut &[Token<'_>]) -> ModalResult<WhereCondition> {
    disjunction(input, where_term)
}

/// Zero or more `.where(...)` suffixes.
fn where_chain(input: &mut &[Token<'_>]) -> ModalResult<Vec<WhereCondition>> {
    repeat(
        0..,
        preceded(
            (kind(TokenKind::Dot), cut_err(kind(TokenKind::Where))),
            delimited(
                cut_err(kind(TokenKind::LParen)),
                cut_err(where_condition),
                cut_err(kind(TokenKind::RParen)),
            ),
        ),
    )
    .parse_next(input)
}

// -- Boolean structure ------------------------------------------------------

fn conjunction<'a, T>(
    input: &mut &[Token<'a>],
    term: fn(&mut &[Token<'a>]) -> ModalResult<T>,
) -> ModalResult<Conjunction<T>> {
    let first = term(input)?;
    let rest: Vec<T> =
        repeat(0.., preceded(kind(TokenKind::And), cut_err(term))).parse_next(input)?;
    let mut terms = Vec::with_capacity(rest.len() + 1);
    terms.push(first);
    terms.extend(rest);
    Ok(Conjunction { terms })
}

fn disjunction<'a, T>(
    input: &mut &[Token<'a>],
    term: fn(&mut &[Token<'a>]) -> ModalResult<T>,
) -> ModalResult<Disjunction<T>> {
    let first = conjunction(input, term)?;
    let rest: Vec<Conjunction<T>> = repeat(
        0..,
        preceded(
            kind(TokenKind::Or),
            cut_err(move |i: &mut &[Token<'a>]| conjunction(i, term)),
        ),
    )
    .parse_next(input)?;
    let mut groups = Vec::with_capacity(rest.len() + 1);
    groups.push(first);
    groups.extend(rest);
    Ok(Disjunction { groups })
}

// -- Span checks ------------------------------------------------------------

fn count_check(input: &mut &[Token<'_>], operation: String) -> ModalResult<SpanCheck> {
    let op = cut_err(compare_op).parse_next(input)?;
    let rhs = cut_err(expression).parse_next(input)?;
    Ok(SpanCheck::Count { operation, op, rhs })
}

fn span_check(input: &mut &[Token<'_>]) -> ModalResult<SpanCheck> {
    match peek(input) {
        TokenKind::Count => {
            let operation = count_expr.parse_next(input)?;
            count_check(input, operation)
        }
        TokenKind::Trace => {
            trace_prefix.parse_next(input)?;
            match peek(input) {
                TokenKind::Has => {
                    let operation =
                        preceded(kind(TokenKind::Has), operation_argument).parse_next(input)?;
                    let filters = where_chain.parse_next(input)?;
                    Ok(SpanCheck::Exists { operation, filters })
                }
                TokenKind::Count => {
                    let operation = count_expr.parse_next(input)?;
                    count_check(input, operation)
                }
                _ => expected(input, "'has' or 'count'"),
            }
        }
        TokenKind::Ident => {
            let operation = operation_name.parse_next(input)?;
            if compare_op_for(peek(input)).is_some() {
                let op = compare_op.parse_next(input)?;
                let rhs = cut_err(expression).parse_next(input)?;
                return Ok(SpanCheck::Compare {
                    path: operation,
                    op,
                    rhs,
                });
            }
            let filters = where_chain.parse_next(input)?;
            Ok(SpanCheck::Exists { operation, filters })
        }
        _ => expected(input, "span check"),
    }
}

fn positive_term(input: &mut &[Token<'_>]) -> ModalResult<Term> {
    match peek(input) {
        TokenKind::LParen => delimited(
            kind(TokenKind::LParen),
            cut_err(condition),
            cut_err(kind(TokenKind::RParen)),
        )
        .map(Term::Grouped)
        .parse_next(input),
        TokenKind::Count | TokenKind::Trace | TokenKind::Ident => {
            span_check.map(Term::Check).parse_next(input)
        }
        _ => expected(input, "span check or '('"),
    }
}

fn term(input: &mut &[Token<'_>]) -> ModalResult<Term> {
    if opt(kind(TokenKind::Not)).parse_next(input)?.is_some() {
        let inner = positive_term.parse_next(input)?;
        return Ok(Term::Not(Box::new(inner)));
    }
    positive_term.parse_next(input)
}

fn condition(input: &mut &[Token<'_>]) -> ModalResult<Condition> {
    disjunction(input, term)
}

fn block(input: &mut &[Token<'_>]) -> ModalResult<Condition> {
    delimited(
        cut_err(kind(TokenKind::LBrace)),
        cut_err(condition),
        cut_err(kind(TokenKind::RBrace)),
    )
    .parse_next(input)
}

// -- Top-level parser -------------------------------------------------------

/// `when { .. }` followed by at most one `always { .. }` and one
/// `never { .. }` in either order, then end of input.
pub(crate) fn rule(input: &mut &[Token<'_>]) -> ModalResult<Rule> {
    cut_err(kind(TokenKind::When)).parse_next(input)?;
    let when = block.parse_next(input)?;

    let mut always = None;
    let mut never = None;
    loop {
        match peek(input) {
            TokenKind::Always if always.is_none() => {
                kind(TokenKind::Always).parse_next(input)?;
                always = Some(block.parse_next(input)?);
            }
            TokenKind::Never if never.is_none() => {
                kind(TokenKind::Never).parse_next(input)?;
                never = Some(block.parse_next(input)?);
            }
            TokenKind::Eof => break,
            TokenKind::Always | TokenKind::Never => {
                return expected(input, "end of input");
            }
            _ => return expected(input, "'always', 'never' or end of input"),
        }
    }
    kind(TokenKind::Eof).parse_next(input)?;

    Ok(Rule {
        when,
        always,
        never,
    })
}
