//! The token model produced by the lexer and consumed by the parser.

/// The kind of a lexical token. `Slash` marks an address delimiter
/// (`/regex/`); `Div` marks the operand delimiter chosen by `s`/`y`
/// (which need not be `/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Error,
    Slash,
    Comma,
    Dollar,
    Backslash,
    Int,
    Lit,
    Cmd,
    Div,
    Ident,
    LBrace,
    RBrace,
    ExpMark,
    Semicolon,
    Newline,
    Colon,
}

/// One lexical token: a kind, the literal text it carries (escape
/// sequences already resolved per the delimiter rule), and its
/// position in the source for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, start: usize, end: usize, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            start,
            end,
            line,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Error => write!(f, "{}", self.value),
            _ if self.value.len() > 10 => write!(f, "{:?}...", &self.value[..10]),
            _ => write!(f, "{:?}", self.value),
        }
    }
}
