use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, take_till, take_while};

use crate::Limits;

use super::error::{LexError, LexErrorKind};
use super::token::{Position, Token, TokenKind};

// -- Whitespace & comments --------------------------------------------------

fn trivia(input: &mut &str) -> ModalResult<()> {
    repeat(
        0..,
        alt((
            take_while(1.., char::is_whitespace).void(),
            ("//", take_till(0.., '\n')).void(),
        )),
    )
    .parse_next(input)
}

// -- Identifiers & keywords -------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn segment<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        any.verify(|c: &char| is_ident_start(*c)),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
}

/// A possibly dotted identifier. A dot is only absorbed when the segment
/// after it is a plain identifier, so `trace.has` and `payment.where` split
/// at the dot while `payment.charge_card` stays whole.
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let start = *input;
    segment.parse_next(input)?;
    loop {
        let checkpoint = input.checkpoint();
        match preceded('.', segment).parse_next(input) {
            Ok(next) if TokenKind::keyword(next).is_none() => {}
            _ => {
                input.reset(&checkpoint);
                break;
            }
        }
    }
    let consumed = start.len() - input.len();
    Ok(&start[..consumed])
}

fn word<'i>(input: &mut &'i str) -> ModalResult<(TokenKind, &'i str)> {
    let text = identifier.parse_next(input)?;
    let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
    Ok((kind, text))
}

// -- Literals ---------------------------------------------------------------

fn number<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)
}

fn in_range(text: &str) -> bool {
    if text.contains('.') {
        text.parse::<f64>().is_ok_and(f64::is_finite)
    } else {
        text.parse::<i64>().is_ok()
    }
}

fn string_literal<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

// -- Operators & punctuation ------------------------------------------------

fn symbol<'i>(input: &mut &'i str) -> ModalResult<(TokenKind, &'i str)> {
    alt((
        "==".value(TokenKind::Eq),
        "!=".value(TokenKind::Neq),
        "<=".value(TokenKind::Lte),
        ">=".value(TokenKind::Gte),
        '<'.value(TokenKind::Lt),
        '>'.value(TokenKind::Gt),
        '('.value(TokenKind::LParen),
        ')'.value(TokenKind::RParen),
        '{'.value(TokenKind::LBrace),
        '}'.value(TokenKind::RBrace),
        '['.value(TokenKind::LBracket),
        ']'.value(TokenKind::RBracket),
        ','.value(TokenKind::Comma),
        '.'.value(TokenKind::Dot),
    ))
    .with_taken()
    .parse_next(input)
}

// -- Position tracking ------------------------------------------------------

/// Converts byte offsets into line/column positions. Offsets must be
/// requested in increasing order so every byte is scanned once.
struct Cursor<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: Position::START,
        }
    }

    fn advance_to(&mut self, offset: usize) -> Position {
        let skipped = self.source.get(self.position.offset..offset).unwrap_or("");
        for c in skipped.chars() {
            if c == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
        self.position.offset = offset;
        self.position
    }
}

// -- Top-level lexer --------------------------------------------------------

/// Tokenize with the default [`Limits`].
///
/// # Errors
///
/// Returns [`LexError`] on an unexpected character, an unterminated string,
/// a numeric literal that does not fit, or oversized input.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    tokenize_with_limits(source, &Limits::default())
}

/// Convert rule text into a token stream terminated by a [`TokenKind::Eof`]
/// token. Whitespace and `//` comments are dropped.
///
/// # Errors
///
/// See [`tokenize`].
pub fn tokenize_with_limits<'a>(
    source: &'a str,
    limits: &Limits,
) -> Result<Vec<Token<'a>>, LexError> {
    if source.len() > limits.max_source_bytes {
        return Err(LexError::new(
            LexErrorKind::InputTooLarge {
                size: source.len(),
                limit: limits.max_source_bytes,
            },
            Position::START,
        ));
    }

    let mut input = source;
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    loop {
        // trivia only ever backtracks, leaving the input where it stopped
        let _ = trivia.parse_next(&mut input);
        let position = cursor.advance_to(source.len() - input.len());

        let Some(first) = input.chars().next() else {
            tokens.push(Token::new(TokenKind::Eof, "", position));
            return Ok(tokens);
        };

        let lexed = match first {
            '"' => string_literal
                .parse_next(&mut input)
                .map(|text| (TokenKind::String, text))
                .map_err(|_| LexErrorKind::UnterminatedString),
            c if c.is_ascii_digit() => match number.parse_next(&mut input) {
                Ok(text) if in_range(text) => Ok((TokenKind::Number, text)),
                Ok(text) => Err(LexErrorKind::NumberOutOfRange(text.to_owned())),
                Err(_) => Err(LexErrorKind::UnexpectedChar(c)),
            },
            c if is_ident_start(c) => word
                .parse_next(&mut input)
                .map_err(|_| LexErrorKind::UnexpectedChar(c)),
            c => symbol
                .parse_next(&mut input)
                .map_err(|_| LexErrorKind::UnexpectedChar(c)),
        };

        match lexed {
            Ok((kind, lexeme)) => tokens.push(Token::new(kind, lexeme, position)),
            Err(kind) => return Err(LexError::new(kind, position)),
        }
    }
}
