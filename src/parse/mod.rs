mod error;
mod grammar;
mod lexer;
mod token;

use std::str::FromStr;

use winnow::Parser;
use winnow::error::StrContext;

use crate::{Limits, Rule};

pub use error::{CompileError, LexError, LexErrorKind, ParseError};
pub use lexer::{tokenize, tokenize_with_limits};
pub use token::{Position, Token, TokenKind};

/// Parse rule text with the default [`Limits`].
///
/// # Errors
///
/// Returns [`CompileError::Lex`] for invalid characters and
/// [`CompileError::Parse`] for grammar violations, both carrying a position.
pub fn parse(source: &str) -> Result<Rule, CompileError> {
    parse_with_limits(source, &Limits::default())
}

/// Parse rule text, bounding input size and nesting depth by `limits`.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with_limits(source: &str, limits: &Limits) -> Result<Rule, CompileError> {
    let tokens = tokenize_with_limits(source, limits)?;
    Ok(parse_tokens_with_limits(&tokens, limits)?)
}

/// Build a [`Rule`] from an already lexed token stream.
///
/// # Errors
///
/// Returns [`ParseError`] if the tokens do not form a rule.
pub fn parse_tokens(tokens: &[Token<'_>]) -> Result<Rule, ParseError> {
    parse_tokens_with_limits(tokens, &Limits::default())
}

fn parse_tokens_with_limits(tokens: &[Token<'_>], limits: &Limits) -> Result<Rule, ParseError> {
    check_nesting(tokens, limits.max_nesting_depth)?;
    grammar::rule.parse(tokens).map_err(|e| {
        let expected: Vec<String> = e
            .inner()
            .context()
            .filter_map(|c| match c {
                StrContext::Expected(v) => Some(v.to_string()),
                _ => None,
            })
            .collect();
        syntax_error(tokens, e.offset(), expected)
    })
}

fn found_at<'t, 'a>(tokens: &'t [Token<'a>], index: usize) -> Option<&'t Token<'a>> {
    tokens.get(index).or_else(|| tokens.last())
}

fn syntax_error(tokens: &[Token<'_>], index: usize, expected: Vec<String>) -> ParseError {
    let found = found_at(tokens, index);
    let position = found.map(|t| t.position).unwrap_or_default();
    let found = found.map_or_else(|| "end of input".to_owned(), ToString::to_string);
    let message = if expected.is_empty() {
        format!("unexpected {found}")
    } else {
        format!("expected {}, found {found}", expected.join(" or "))
    };
    ParseError::new(message, position, expected, found)
}

/// Reject delimiter nesting deeper than `max_depth` before descending, so
/// adversarial input cannot exhaust the stack.
fn check_nesting(tokens: &[Token<'_>], max_depth: usize) -> Result<(), ParseError> {
    let mut depth = 0_usize;
    for token in tokens {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::new(
                        format!("nesting exceeds the maximum depth of {max_depth}"),
                        token.position,
                        Vec::new(),
                        token.to_string(),
                    ));
                }
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(())
}

/// True when `name` lexes as exactly one identifier token.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    match tokenize(name) {
        Ok(tokens) => matches!(
            tokens.as_slice(),
            [t, eof] if t.kind == TokenKind::Ident && t.lexeme == name && eof.kind == TokenKind::Eof
        ),
        Err(_) => false,
    }
}

impl FromStr for Rule {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
