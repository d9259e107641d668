//! Error types for the sed engine, shared by the lexer, parser, and
//! runtime.

use std::path::PathBuf;

use thiserror::Error;

/// A single position-tagged diagnostic produced while lexing or
/// parsing a script. Lex and parse errors are collected rather than
/// raised, so [`crate::compile`] returns a `Vec<Diagnostic>` on
/// failure instead of a single `SedError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {}, col {})", self.message, self.line, self.col)
    }
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: message.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Error)]
pub enum SedError {
    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("couldn't open file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Carries whatever output a `Run` had already produced before a
/// runtime I/O command (`r`/`R`/`w`/`W`/`s///w`) failed, per the
/// "prior output is preserved and returned alongside the error" policy.
#[derive(Debug)]
pub struct RuntimeFailure {
    pub output: String,
    pub error: SedError,
}

impl std::fmt::Display for RuntimeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RuntimeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, SedError>;
