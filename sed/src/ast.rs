//! The compiled data model: addresses, commands, and programs.
//!
//! Collapses `go-sed`'s per-variant `addresser`/`statement`
//! interfaces (`ast.go`) into tagged enums, which is the more
//! idiomatic shape for a closed command set in Rust.

use crate::regex_engine::CompiledRegex;

/// `SFlags` for the `s` command. The zero value (`Default`) means
/// "no flag set", matching the distilled spec's data model.
#[derive(Debug, Clone, Default)]
pub struct SFlags {
    /// Replace only the Nth match (1-based). `None` means "not set".
    pub n: Option<usize>,
    pub global: bool,
    pub print: bool,
    pub write_file: Option<String>,
}

/// One half of a range address, or a standalone address.
#[derive(Debug, Clone)]
pub enum Address {
    Every,
    Line(usize),
    Last,
    Regex(CompiledRegex),
    /// `on` tracks nothing here: range latch state lives in a
    /// parallel array owned by the runtime (see `runtime.rs`), indexed
    /// by the `usize` latch id assigned at parse time, not on this
    /// shared, immutable value, so that a compiled `Program` can be
    /// reused safely across runs.
    Range(Box<Address>, Box<Address>, usize),
    Not(Box<Address>),
}

#[derive(Debug, Clone)]
pub enum Command {
    Append(String),
    Branch(String),
    Change(String),
    Delete,
    DeleteFirstLine,
    Get,
    GetAppend,
    Hold,
    HoldAppend,
    Insert(String),
    Next,
    NextAppend,
    Print,
    PrintFirstLine,
    Quit { print: bool },
    ReadFile(String),
    ReadLineFromFile(String),
    Substitute {
        find: CompiledRegex,
        replace: String,
        flags: SFlags,
    },
    Test(String),
    WriteFile(String),
    WriteFirstLine(String),
    Exchange,
    Transliterate(Vec<(char, char)>),
    Zap,
    LineNumber,
    Block(Program),
}

/// One addressed statement: an optional address (defaulting to
/// "every line"), an optional negation flag, and the command itself.
#[derive(Debug, Clone)]
pub struct Statement {
    pub address: Option<Address>,
    pub negated: bool,
    pub command: Command,
}

/// A fully resolved, executable program: an ordered statement list
/// plus a label table mapping names to statement indices. Immutable
/// once compiled; see `Address::Range`'s doc comment for why latch
/// state is kept out of this type.
///
/// `range_count` is meaningful only on the top-level `Program` a
/// [`crate::parser::parse`] call returns: it is the total number of
/// `Range` addresses anywhere in the program, including nested blocks,
/// and sizes the runtime's flat latch vector (latch ids are assigned
/// once, crate-wide per compile, regardless of block nesting).
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub labels: std::collections::HashMap<String, usize>,
    pub range_count: usize,
    /// Set when the source began with the conventional `#n` marker,
    /// meaningful only on the top-level `Program`; see
    /// [`crate::compile`], which folds it into `suppress_autoprint`.
    pub leading_hash_n: bool,
}

impl Program {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
