use std::fmt;

/// A location in rule source text.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with columns
/// counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub(crate) const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The category of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // keywords
    When,
    Always,
    Never,
    Trace,
    Has,
    Where,
    Count,
    And,
    Or,
    Not,
    In,
    Matches,
    Contains,
    True,
    False,

    // literals
    Ident,
    Number,
    String,

    // operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,

    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,

    Eof,
}

impl TokenKind {
    /// Map a whole word to its keyword kind, if it is reserved.
    pub(crate) fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "when" => TokenKind::When,
            "always" => TokenKind::Always,
            "never" => TokenKind::Never,
            "trace" => TokenKind::Trace,
            "has" => TokenKind::Has,
            "where" => TokenKind::Where,
            "count" => TokenKind::Count,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "matches" => TokenKind::Matches,
            "contains" => TokenKind::Contains,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    /// Human-readable description used in error messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::When => "'when'",
            TokenKind::Always => "'always'",
            TokenKind::Never => "'never'",
            TokenKind::Trace => "'trace'",
            TokenKind::Has => "'has'",
            TokenKind::Where => "'where'",
            TokenKind::Count => "'count'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::In => "'in'",
            TokenKind::Matches => "'matches'",
            TokenKind::Contains => "'contains'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Eq => "'=='",
            TokenKind::Neq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Lte => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Gte => "'>='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single lexed token borrowing its text from the source.
///
/// For string literals `lexeme` is the content between the quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub position: Position,
}

impl<'a> Token<'a> {
    pub(crate) fn new(kind: TokenKind, lexeme: &'a str, position: Position) -> Self {
        Self {
            kind,
            lexeme,
            position,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident | TokenKind::Number => write!(f, "'{}'", self.lexeme),
            TokenKind::String => write!(f, "string \"{}\"", self.lexeme),
            kind => f.write_str(kind.describe()),
        }
    }
}
