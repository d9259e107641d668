//! Mode-switched scanner. Reimplements the state-machine shape of
//! `go-sed`'s `lexStart`/`lexNextAddrOrCommand`/`lex2ndAddr`/
//! `lexInsideAddr`/`afterCmd` dispatch as a struct that eagerly builds
//! a `Vec<Token>` rather than feeding a channel from a goroutine --
//! laziness isn't a requirement here, a buffered token vector is
//! simpler and sufficient.

use crate::token::{Token, TokenKind};

/// The lexer's current sub-grammar. Each variant corresponds to one
/// of the state functions in the original Go scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Start,
    Post1stAddr,
    SecondAddr,
    AfterCmd(char),
    Flags,
    LabelBody,
    Done,
}

/// Commands that are themselves valid (including the historical `=`
/// and the nonstandard but widely supported GNU addition `z`).
const VALID_COMMANDS: &str = "abcdDgGhHinNpPqrRstwWxyz=";

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    /// Set when the script begins with the conventional `#n` marker,
    /// which behaves like `-n` was passed on the command line.
    pub leading_hash_n: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            leading_hash_n: false,
        }
    }

    /// Scans the whole input and returns its token sequence, always
    /// terminated by a single `Eof` token (or an `Error` token if the
    /// scan could not continue).
    pub fn lex(&mut self) -> Vec<Token> {
        let mut mode = Mode::Start;
        loop {
            mode = match mode {
                Mode::Start => self.lex_start(),
                Mode::Post1stAddr => self.lex_post_1st_addr(),
                Mode::SecondAddr => self.lex_2nd_addr(),
                Mode::AfterCmd(c) => self.lex_after_cmd(c),
                Mode::Flags => self.lex_flags(),
                Mode::LabelBody => self.lex_label_body(),
                Mode::Done => break,
            };
        }
        std::mem::take(&mut self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
            }
        }
        c
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
    }

    fn push(&mut self, kind: TokenKind, value: impl Into<String>, start: usize) {
        let line = self.line;
        self.tokens.push(Token::new(kind, value, start, self.pos, line));
    }

    fn error(&mut self, message: impl Into<String>) {
        let start = self.pos;
        let line = self.line;
        self.tokens
            .push(Token::new(TokenKind::Error, message.into(), start, start, line));
    }

    /// Consumes a `#`-led comment through end of line (exclusive).
    /// Checks for the conventional leading `#n` marker.
    fn consume_comment(&mut self, start: usize) {
        if start == 0 && self.peek_at(1) == Some('n') {
            let after = self.peek_at(2);
            if after.is_none() || after == Some('\n') {
                self.leading_hash_n = true;
            }
        }
        while !matches!(self.peek(), None | Some('\n')) {
            self.pos += 1;
        }
    }

    fn lex_start(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        let Some(c) = self.peek() else {
            self.push(TokenKind::Eof, "", start);
            return Mode::Done;
        };
        match c {
            '#' => {
                self.consume_comment(start);
                Mode::Start
            }
            ';' => {
                self.advance();
                self.push(TokenKind::Semicolon, ";", start);
                Mode::Start
            }
            '\n' => {
                self.advance();
                self.push(TokenKind::Newline, "\n", start);
                Mode::Start
            }
            '}' => {
                self.advance();
                self.push(TokenKind::RBrace, "}", start);
                Mode::Start
            }
            '{' => {
                self.advance();
                self.push(TokenKind::LBrace, "{", start);
                Mode::Start
            }
            ':' => {
                self.advance();
                self.push(TokenKind::Colon, ":", start);
                Mode::LabelBody
            }
            c if c.is_ascii_digit() => self.lex_int(),
            '$' => {
                self.advance();
                self.push(TokenKind::Dollar, "$", start);
                Mode::Post1stAddr
            }
            '/' => self.lex_addr_regex('/'),
            '\\' => self.lex_addr_regex_custom_delim(),
            c if c.is_ascii_alphabetic() || c == '=' => self.lex_command(c),
            _ => {
                self.error(format!("unexpected character {c:?}"));
                Mode::Done
            }
        }
    }

    fn lex_int(&mut self) -> Mode {
        let start = self.pos;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Int, s, start);
        Mode::Post1stAddr
    }

    /// `/regex/`: the opening `/` is consumed by the caller context;
    /// this emits `Slash`, the literal body, and the closing `Slash`.
    fn lex_addr_regex(&mut self, delim: char) -> Mode {
        let start = self.pos;
        self.advance(); // consume opening delimiter
        self.push(TokenKind::Slash, delim.to_string(), start);
        self.lex_delimited_literal(delim, TokenKind::Slash);
        Mode::Post1stAddr
    }

    /// `\Xregex X`: a backslash followed by an arbitrary delimiter
    /// character.
    fn lex_addr_regex_custom_delim(&mut self) -> Mode {
        let start = self.pos;
        self.advance(); // backslash
        let Some(delim) = self.advance() else {
            self.error("expected delimiter after backslash");
            return Mode::Done;
        };
        self.push(TokenKind::Slash, delim.to_string(), start);
        self.lex_delimited_literal(delim, TokenKind::Slash);
        Mode::Post1stAddr
    }

    /// Shared body-scanner for both address regex literals (`Slash`
    /// closers) and `s`/`y` operands (`Div` closers). Implements the
    /// delimiter escape rule: `\D` collapses to `D`, `\<newline>`
    /// collapses to a literal newline, any other `\x` passes through
    /// unchanged so the regex engine can interpret it itself.
    fn lex_delimited_literal(&mut self, delim: char, closer: TokenKind) {
        let lit_start = self.pos;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error("unterminated literal: missing closing delimiter");
                    return;
                }
                Some(c) if c == delim => {
                    self.push(TokenKind::Lit, value, lit_start);
                    let close_start = self.pos;
                    self.advance();
                    self.push(closer, delim.to_string(), close_start);
                    return;
                }
                Some('\n') => {
                    self.error("unterminated literal: unescaped newline");
                    return;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c) if c == delim => {
                            value.push(delim);
                            self.advance();
                        }
                        Some('\n') => {
                            value.push('\n');
                            self.advance();
                        }
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                            self.advance();
                        }
                        None => {
                            self.error("unterminated literal: trailing backslash");
                            return;
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_post_1st_addr(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        match self.peek() {
            Some(',') => {
                self.advance();
                self.push(TokenKind::Comma, ",", start);
                Mode::SecondAddr
            }
            Some('!') => {
                self.advance();
                self.push(TokenKind::ExpMark, "!", start);
                Mode::Post1stAddr
            }
            _ => self.lex_cmd_or_brace(),
        }
    }

    fn lex_2nd_addr(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        match self.peek() {
            Some('$') => {
                self.advance();
                self.push(TokenKind::Dollar, "$", start);
                Mode::Post1stAddr
            }
            Some('/') => self.lex_addr_regex('/'),
            Some('\\') => self.lex_addr_regex_custom_delim(),
            Some(c) if c.is_ascii_digit() => self.lex_int(),
            _ => {
                self.error("expected second address after ','");
                Mode::Done
            }
        }
    }

    fn lex_cmd_or_brace(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        match self.peek() {
            None => {
                self.push(TokenKind::Eof, "", start);
                Mode::Done
            }
            Some('{') => {
                self.advance();
                self.push(TokenKind::LBrace, "{", start);
                Mode::Start
            }
            Some('}') => {
                self.advance();
                self.push(TokenKind::RBrace, "}", start);
                Mode::Start
            }
            Some(';') => {
                self.advance();
                self.push(TokenKind::Semicolon, ";", start);
                Mode::Start
            }
            Some('\n') => {
                self.advance();
                self.push(TokenKind::Newline, "\n", start);
                Mode::Start
            }
            Some('#') => {
                self.consume_comment(start);
                Mode::Start
            }
            Some(c) if c.is_ascii_alphabetic() || c == '=' => self.lex_command(c),
            Some(c) => {
                self.error(format!("expected a command, found {c:?}"));
                Mode::Done
            }
        }
    }

    fn lex_command(&mut self, c: char) -> Mode {
        if !VALID_COMMANDS.contains(c) {
            self.error(format!("unknown command {c:?}"));
            return Mode::Done;
        }
        let start = self.pos;
        self.advance();
        self.push(TokenKind::Cmd, c.to_string(), start);
        Mode::AfterCmd(c)
    }

    fn lex_after_cmd(&mut self, c: char) -> Mode {
        match c {
            's' | 'y' => self.lex_s_or_y(),
            'a' | 'i' | 'c' => self.lex_text_arg(),
            'b' | 't' => self.lex_ident_to_terminator(),
            'r' | 'R' | 'w' | 'W' => self.lex_ident_to_terminator(),
            _ => Mode::Start,
        }
    }

    fn lex_s_or_y(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        let Some(delim) = self.advance() else {
            self.error("expected delimiter after s/y");
            return Mode::Done;
        };
        if delim == '\\' || delim == '\n' {
            self.error("delimiter character cannot be backslash or newline");
            return Mode::Done;
        }
        self.push(TokenKind::Div, delim.to_string(), start);
        self.lex_delimited_literal(delim, TokenKind::Div);
        self.lex_delimited_literal(delim, TokenKind::Div);
        Mode::Flags
    }

    /// `a`, `i`, `c`: a backslash-continued text argument. GNU-style
    /// single-line `a text` (no backslash) is also accepted since it
    /// is unambiguous and widely relied upon.
    fn lex_text_arg(&mut self) -> Mode {
        self.skip_blanks();
        let bstart = self.pos;
        if self.peek() == Some('\\') {
            self.advance();
            self.push(TokenKind::Backslash, "\\", bstart);
            if self.peek() == Some('\n') {
                self.advance();
            } else {
                self.skip_blanks();
            }
        }
        let lit_start = self.pos;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => break,
                Some('\n') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                    value.push('\n');
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        self.push(TokenKind::Lit, value, lit_start);
        let nl_start = self.pos;
        self.push(TokenKind::Newline, "\n", nl_start);
        Mode::Start
    }

    fn lex_ident_to_terminator(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        let mut value = String::new();
        while !matches!(self.peek(), None | Some(';') | Some('\n')) {
            value.push(self.peek().unwrap());
            self.advance();
        }
        self.push(TokenKind::Ident, value, start);
        Mode::Start
    }

    /// Flags are not individually tokenized (the token kind set has
    /// no dedicated flag kind); the whole flag tail, including a
    /// trailing `w filename` if present, is captured as one `Lit` and
    /// parsed by the parser.
    fn lex_flags(&mut self) -> Mode {
        let start = self.pos;
        let mut value = String::new();
        while !matches!(self.peek(), None | Some(';') | Some('\n') | Some('}')) {
            value.push(self.peek().unwrap());
            self.advance();
        }
        self.push(TokenKind::Lit, value, start);
        Mode::Start
    }

    fn lex_label_body(&mut self) -> Mode {
        self.skip_blanks();
        let start = self.pos;
        let mut value = String::new();
        while !matches!(self.peek(), None | Some(';') | Some('\n')) {
            value.push(self.peek().unwrap());
            self.advance();
        }
        self.push(TokenKind::Ident, value, start);
        Mode::Start
    }
}

/// Tokenizes `source`, returning the token sequence and whether the
/// script began with the conventional `#n` marker.
pub fn lex(source: &str) -> (Vec<Token>, bool) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.lex();
    (tokens, lexer.leading_hash_n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).lex().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_simple_print() {
        let toks = Lexer::new("p").lex();
        assert_eq!(toks[0].kind, TokenKind::Cmd);
        assert_eq!(toks[0].value, "p");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn lexes_address_regex_and_command() {
        let toks = Lexer::new("/foo/d").lex();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Slash,
                TokenKind::Lit,
                TokenKind::Slash,
                TokenKind::Cmd,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_range_address() {
        let toks = Lexer::new("1,/end/p").lex();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Comma,
                TokenKind::Slash,
                TokenKind::Lit,
                TokenKind::Slash,
                TokenKind::Cmd,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_substitution_with_flags() {
        let toks = Lexer::new("s/a/b/g").lex();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Cmd,
                TokenKind::Div,
                TokenKind::Lit,
                TokenKind::Div,
                TokenKind::Lit,
                TokenKind::Div,
                TokenKind::Lit, // flags
                TokenKind::Eof,
            ]
        );
        assert_eq!(toks[6].value, "g");
    }

    #[test]
    fn delimiter_escape_rule() {
        // \/ collapses to / ; \( passes through unchanged for the regex engine.
        let toks = Lexer::new(r"/a\/b\(c/d").lex();
        let lit = toks.iter().find(|t| t.kind == TokenKind::Lit).unwrap();
        assert_eq!(lit.value, r"a/b\(c");
    }

    #[test]
    fn custom_delimiter_address() {
        let toks = Lexer::new(r"\#foo#d").lex();
        assert_eq!(toks[0].kind, TokenKind::Slash);
        assert_eq!(toks[0].value, "#");
    }

    #[test]
    fn labels_and_branches() {
        let toks = kinds(":top\nbtop\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Cmd,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_braces() {
        let toks = kinds("/x/{p;d}");
        assert_eq!(
            toks,
            vec![
                TokenKind::Slash,
                TokenKind::Lit,
                TokenKind::Slash,
                TokenKind::LBrace,
                TokenKind::Cmd,
                TokenKind::Semicolon,
                TokenKind::Cmd,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_hash_n_marker() {
        let (_, leading) = lex("#n\np\n");
        assert!(leading);
        let (_, leading) = lex("p\n");
        assert!(!leading);
    }

    #[test]
    fn append_text_continuation() {
        let toks = Lexer::new("a\\\nhello\\\nworld\n").lex();
        let lit = toks.iter().find(|t| t.kind == TokenKind::Lit).unwrap();
        assert_eq!(lit.value, "hello\nworld");
    }
}
