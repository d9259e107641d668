//! Recursive-descent parser. Consumes the lexer's token vector and
//! builds a [`Program`]: a statement list plus a label table, with
//! nested sub-programs for `{ ... }` blocks.
//!
//! Grounded in `original_source/ast/parser.go`'s `Parser`/`ParseProgram`/
//! `parseStatement`/`parseAddress`/`parseFlags`, reworked to collect
//! [`Diagnostic`]s instead of `[]string` and to build the tagged-enum
//! `Address`/`Command` model from `ast.rs` instead of per-variant
//! structs implementing a shared interface.

use crate::ast::{Address, Command, Program, SFlags, Statement};
use crate::error::Diagnostic;
use crate::regex_engine::CompiledRegex;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    extended: bool,
    diagnostics: Vec<Diagnostic>,
    /// Next id to assign to a `Range` address's runtime latch. Shared
    /// across nested blocks so the whole program's latches can live in
    /// one flat `Vec` at runtime regardless of block nesting.
    next_range_id: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, extended: bool) -> Self {
        Self {
            tokens,
            pos: 0,
            extended,
            diagnostics: Vec::new(),
            next_range_id: 0,
        }
    }

    /// Parses the whole token stream into a top-level [`Program`],
    /// returning any diagnostics collected along the way. A non-empty
    /// diagnostic list means the program is not safe to run.
    pub fn parse(mut self, leading_hash_n: bool) -> (Program, Vec<Diagnostic>) {
        let mut program = self.parse_program(false);
        program.range_count = self.next_range_id;
        program.leading_hash_n = leading_hash_n;
        (program, self.diagnostics)
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&mut self, message: impl Into<String>) {
        let tok = self.cur();
        self.diagnostics.push(Diagnostic::new(message, tok.line, tok.start));
    }

    /// Consumes `kind`, returning its token, or records a diagnostic
    /// and returns `None` without advancing.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.cur_is(kind) {
            Some(self.advance())
        } else {
            let found = self.cur().kind;
            self.error(format!("expected {kind:?}, found {found:?}"));
            None
        }
    }

    fn is_statement_delim(&self, kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::RBrace
        )
    }

    /// Skips any run of statement-separator tokens (`;`, newline).
    fn skip_separators(&mut self) {
        while matches!(self.cur().kind, TokenKind::Semicolon | TokenKind::Newline) {
            self.advance();
        }
    }

    /// Recovers from a malformed statement by skipping tokens up to
    /// the next separator, so one bad statement doesn't cascade into
    /// spurious errors for the rest of the script.
    fn recover_to_separator(&mut self) {
        while !self.is_statement_delim(self.cur().kind) {
            self.advance();
        }
    }

    /// Parses a sequence of statements. When `in_block` is set, parsing
    /// stops at (and consumes) a closing `}`; at top level it stops at
    /// `EOF`.
    fn parse_program(&mut self, in_block: bool) -> Program {
        let mut program = Program::default();
        loop {
            self.skip_separators();
            if self.cur_is(TokenKind::Eof) {
                if in_block {
                    self.error("unterminated block: missing '}'");
                }
                break;
            }
            if in_block && self.cur_is(TokenKind::RBrace) {
                self.advance();
                break;
            }
            if self.cur_is(TokenKind::Colon) {
                self.advance();
                match self.expect(TokenKind::Ident) {
                    Some(tok) if !tok.value.is_empty() => {
                        program.labels.insert(tok.value, program.statements.len());
                    }
                    Some(_) => self.error("label name must not be empty"),
                    None => {}
                }
                continue;
            }
            if self.cur_is(TokenKind::Error) {
                self.error(self.cur().value.clone());
                break;
            }
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            } else {
                self.recover_to_separator();
            }
        }
        program
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let address = self.parse_address();
        let mut negated = false;
        while self.cur_is(TokenKind::ExpMark) {
            self.advance();
            negated = !negated;
        }

        if self.cur_is(TokenKind::LBrace) {
            self.advance();
            let nested = self.parse_program(true);
            return Some(Statement {
                address,
                negated,
                command: Command::Block(nested),
            });
        }

        if !self.cur_is(TokenKind::Cmd) {
            let found = self.cur().kind;
            self.error(format!("expected a command or '{{', found {found:?}"));
            return None;
        }
        let cmd_tok = self.advance();
        let command = self.parse_command(&cmd_tok.value)?;
        if !self.is_statement_delim(self.cur().kind) {
            let found = self.cur().kind;
            self.error(format!("expected statement terminator, found {found:?}"));
        }
        Some(Statement {
            address,
            negated,
            command,
        })
    }

    fn parse_address(&mut self) -> Option<Address> {
        if !matches!(self.cur().kind, TokenKind::Int | TokenKind::Dollar | TokenKind::Slash) {
            return None;
        }
        let first = self.parse_address_part()?;
        if self.cur_is(TokenKind::Comma) {
            self.advance();
            let second = self.parse_address_part()?;
            let id = self.next_range_id;
            self.next_range_id += 1;
            Some(Address::Range(Box::new(first), Box::new(second), id))
        } else {
            Some(first)
        }
    }

    fn parse_address_part(&mut self) -> Option<Address> {
        match self.cur().kind {
            TokenKind::Int => {
                let tok = self.advance();
                match tok.value.parse::<usize>() {
                    Ok(0) | Err(_) => {
                        self.error(format!("invalid line-number address {:?}", tok.value));
                        None
                    }
                    Ok(n) => Some(Address::Line(n)),
                }
            }
            TokenKind::Dollar => {
                self.advance();
                Some(Address::Last)
            }
            TokenKind::Slash => {
                self.advance();
                let lit = self.expect(TokenKind::Lit)?.value;
                self.expect(TokenKind::Slash)?;
                match CompiledRegex::compile(&lit, self.extended) {
                    Ok(re) => Some(Address::Regex(re)),
                    Err(e) => {
                        self.error(e.to_string());
                        None
                    }
                }
            }
            other => {
                self.error(format!("expected an address, found {other:?}"));
                None
            }
        }
    }

    fn parse_command(&mut self, cmd: &str) -> Option<Command> {
        match cmd {
            "a" => Some(Command::Append(self.parse_text_arg()?)),
            "b" => Some(Command::Branch(self.parse_ident()?)),
            "c" => Some(Command::Change(self.parse_text_arg()?)),
            "d" => Some(Command::Delete),
            "D" => Some(Command::DeleteFirstLine),
            "g" => Some(Command::Get),
            "G" => Some(Command::GetAppend),
            "h" => Some(Command::Hold),
            "H" => Some(Command::HoldAppend),
            "i" => Some(Command::Insert(self.parse_text_arg()?)),
            "n" => Some(Command::Next),
            "N" => Some(Command::NextAppend),
            "p" => Some(Command::Print),
            "P" => Some(Command::PrintFirstLine),
            "q" => Some(Command::Quit { print: true }),
            "r" => Some(Command::ReadFile(self.parse_ident()?)),
            "R" => Some(Command::ReadLineFromFile(self.parse_ident()?)),
            "s" => self.parse_substitute(),
            "t" => Some(Command::Test(self.parse_ident()?)),
            "w" => Some(Command::WriteFile(self.parse_ident()?)),
            "W" => Some(Command::WriteFirstLine(self.parse_ident()?)),
            "x" => Some(Command::Exchange),
            "y" => self.parse_transliterate(),
            "z" => Some(Command::Zap),
            "=" => Some(Command::LineNumber),
            other => {
                self.error(format!("unsupported command {other:?}"));
                None
            }
        }
    }

    /// `a`/`i`/`c`: an optional `Backslash` token followed by the
    /// joined literal text the lexer already assembled.
    fn parse_text_arg(&mut self) -> Option<String> {
        if self.cur_is(TokenKind::Backslash) {
            self.advance();
        }
        Some(self.expect(TokenKind::Lit)?.value)
    }

    /// `b`/`t`/`r`/`R`/`w`/`W`: a single `Ident` token (possibly empty,
    /// meaning "branch to end" for `b`/`t`).
    fn parse_ident(&mut self) -> Option<String> {
        Some(self.expect(TokenKind::Ident)?.value)
    }

    fn parse_substitute(&mut self) -> Option<Command> {
        self.expect(TokenKind::Div)?;
        let find = self.expect(TokenKind::Lit)?.value;
        self.expect(TokenKind::Div)?;
        let replace = self.expect(TokenKind::Lit)?.value;
        self.expect(TokenKind::Div)?;
        let flags_str = self.expect(TokenKind::Lit)?.value;
        let flags = self.parse_sflags(&flags_str)?;
        let regex = match CompiledRegex::compile(&find, self.extended) {
            Ok(re) => re,
            Err(e) => {
                self.error(e.to_string());
                return None;
            }
        };
        Some(Command::Substitute {
            find: regex,
            replace,
            flags,
        })
    }

    fn parse_sflags(&mut self, raw: &str) -> Option<SFlags> {
        let mut flags = SFlags::default();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                ' ' | '\t' => {}
                '1'..='9' => flags.n = Some(c.to_digit(10).unwrap() as usize),
                'g' => flags.global = true,
                'p' => flags.print = true,
                'w' => {
                    while matches!(chars.peek(), Some(' ') | Some('\t')) {
                        chars.next();
                    }
                    let file: String = chars.collect();
                    if file.is_empty() {
                        self.error("'w' flag requires a filename");
                        return None;
                    }
                    flags.write_file = Some(file);
                    break;
                }
                other => {
                    self.error(format!("unrecognized 's' flag {other:?}"));
                    return None;
                }
            }
        }
        Some(flags)
    }

    fn parse_transliterate(&mut self) -> Option<Command> {
        self.expect(TokenKind::Div)?;
        let from = self.expect(TokenKind::Lit)?.value;
        self.expect(TokenKind::Div)?;
        let to = self.expect(TokenKind::Lit)?.value;
        self.expect(TokenKind::Div)?;
        // `y` carries no flags, but the lexer still emits a trailing
        // flags `Lit` (possibly empty) for grammar uniformity with `s`.
        let trailing = self.expect(TokenKind::Lit)?.value;
        if !trailing.trim().is_empty() {
            self.error("'y' command does not accept flags");
            return None;
        }
        let from_chars: Vec<char> = from.chars().collect();
        let to_chars: Vec<char> = to.chars().collect();
        if from_chars.len() != to_chars.len() {
            self.error(format!(
                "y command strings differ in length: {} != {}",
                from_chars.len(),
                to_chars.len()
            ));
            return None;
        }
        Some(Command::Transliterate(
            from_chars.into_iter().zip(to_chars).collect(),
        ))
    }
}

/// Parses `source` end to end, returning the top-level [`Program`] and
/// any collected diagnostics.
pub fn parse(source: &str, extended: bool) -> (Program, Vec<Diagnostic>) {
    let (tokens, leading_hash_n) = crate::lexer::lex(source);
    Parser::new(tokens, extended).parse(leading_hash_n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(source: &str) -> Program {
        let (program, diags) = parse(source, false);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        program
    }

    #[test]
    fn parses_simple_print() {
        let program = ok("p");
        assert_eq!(program.len(), 1);
        assert!(matches!(program.statements[0].command, Command::Print));
    }

    #[test]
    fn parses_address_and_command() {
        let program = ok("/foo/d");
        assert!(matches!(program.statements[0].address, Some(Address::Regex(_))));
        assert!(matches!(program.statements[0].command, Command::Delete));
    }

    #[test]
    fn parses_range_address() {
        let program = ok("1,/end/p");
        match &program.statements[0].address {
            Some(Address::Range(a, b, _id)) => {
                assert!(matches!(**a, Address::Line(1)));
                assert!(matches!(**b, Address::Regex(_)));
            }
            other => panic!("expected range address, got {other:?}"),
        }
    }

    #[test]
    fn parses_negation() {
        let program = ok("1!d");
        assert!(program.statements[0].negated);
    }

    #[test]
    fn parses_block_with_nested_labels() {
        let program = ok("/x/{ :top\np\nbtop\n}");
        match &program.statements[0].command {
            Command::Block(nested) => {
                assert_eq!(nested.labels.get("top"), Some(&0));
                assert_eq!(nested.statements.len(), 2);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn parses_substitution_flags() {
        let program = ok("s/a/b/g2p");
        match &program.statements[0].command {
            Command::Substitute { flags, .. } => {
                assert!(flags.global);
                assert!(flags.print);
                assert_eq!(flags.n, Some(2));
            }
            other => panic!("expected substitute, got {other:?}"),
        }
    }

    #[test]
    fn parses_s_with_w_flag() {
        let program = ok("s/a/b/w out.txt");
        match &program.statements[0].command {
            Command::Substitute { flags, .. } => {
                assert_eq!(flags.write_file.as_deref(), Some("out.txt"));
            }
            other => panic!("expected substitute, got {other:?}"),
        }
    }

    #[test]
    fn parses_transliterate() {
        let program = ok("y/abc/xyz/");
        match &program.statements[0].command {
            Command::Transliterate(pairs) => {
                assert_eq!(pairs.as_slice(), [('a', 'x'), ('b', 'y'), ('c', 'z')]);
            }
            other => panic!("expected transliterate, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_y_lengths_is_an_error() {
        let (_program, diags) = parse("y/ab/x/", false);
        assert!(!diags.is_empty());
    }

    #[test]
    fn empty_branch_label_is_legal() {
        let program = ok("b");
        assert!(matches!(&program.statements[0].command, Command::Branch(l) if l.is_empty()));
    }

    #[test]
    fn parses_labels_and_branches_program() {
        let program = ok(":again\ns/x/xx/p\ntagain\n");
        assert_eq!(program.labels.get("again"), Some(&0));
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let (_program, diags) = parse("/x/{ p", false);
        assert!(!diags.is_empty());
    }

    #[test]
    fn append_insert_change_text() {
        let program = ok("a\\\nhello world\n");
        assert!(matches!(&program.statements[0].command, Command::Append(t) if t == "hello world"));
    }
}
