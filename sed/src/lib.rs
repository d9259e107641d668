//! A small POSIX-flavored stream-editor engine: lex, parse, and run a
//! `sed`-style script against text.
//!
//! Grounded in `text/src/tr.rs`'s shape for a `posixutils-rs` text
//! utility crate (a thin `lib.rs` the binary and integration tests
//! both depend on) and `text/sed.rs` for the module breakdown this
//! crate fleshes out: lexer, parser, regex/file capabilities, runtime.

pub mod ast;
pub mod error;
pub mod fileio;
pub mod lexer;
pub mod parser;
pub mod regex_engine;
pub mod runtime;
pub mod token;

use std::cell::RefCell;

pub use error::{Diagnostic, RuntimeFailure, SedError};
pub use fileio::{FileIo, StdFileIo};
pub use runtime::{Options, StreamState};
pub use token::Token;

/// A compiled, reusable script together with the options it was
/// compiled with. Build one with [`compile`].
pub struct Program {
    ast: ast::Program,
    options: Options,
    stream: RefCell<Option<StreamState>>,
}

/// Either a compiled [`Program`] or the diagnostics that kept it from
/// compiling, matching §7's "compile returns either a Program or the
/// list" policy.
pub fn compile(source: &str, mut options: Options) -> Result<Program, Vec<Diagnostic>> {
    let (ast, diagnostics) = parser::parse(source, options.extended_regex);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    options.suppress_autoprint |= ast.leading_hash_n;
    Ok(Program {
        ast,
        options,
        stream: RefCell::new(None),
    })
}

/// The token sequence a script lexes to, for tooling/debuggers that
/// want to inspect how the scanner carved up a script without running
/// the parser over it.
pub fn info(source: &str) -> Vec<Token> {
    lexer::lex(source).0
}

impl Program {
    /// Runs the whole of `input` through the script with fresh state:
    /// empty hold space, every range latch off. Safe to call
    /// repeatedly and concurrently with other `filter` calls on the
    /// same `Program`, since nothing here is mutated.
    pub fn filter(&self, input: &str) -> std::result::Result<String, RuntimeFailure> {
        let mut file_io = StdFileIo::default();
        runtime::run(&self.ast, input, &self.options, &mut file_io)
    }

    /// Like [`Program::filter`], but writes `r`/`R`/`w`/`W` traffic
    /// through a caller-supplied [`FileIo`] instead of the real
    /// filesystem (used by tests).
    pub fn filter_with(&self, input: &str, file_io: &mut dyn FileIo) -> std::result::Result<String, RuntimeFailure> {
        runtime::run(&self.ast, input, &self.options, file_io)
    }

    /// Runs one chunk of input, preserving hold space, range latches,
    /// and the absolute line counter across calls. Unlike
    /// [`Program::filter`], the chunk's output is handed back verbatim
    /// (no trailing-newline trim, since a single chunk is never the
    /// outermost Run) — a no-output cycle (`d`, or `-n` with no `p`)
    /// returns `""`, so a line-at-a-time driver can print each result
    /// as-is without adding its own newline. See [`runtime::StreamState`]
    /// for the chunk-boundary caveats around `$` and `N`/`n`.
    pub fn filter_streaming(&self, chunk: &str) -> std::result::Result<String, RuntimeFailure> {
        let mut slot = self.stream.borrow_mut();
        let state = slot.get_or_insert_with(|| StreamState::new(self.ast.range_count));
        runtime::run_chunk(&self.ast, chunk, &self.options, state)
    }

    /// Forgets any state accumulated by prior [`Program::filter_streaming`]
    /// calls, as if the `Program` had just been compiled.
    pub fn reset_stream(&self) {
        *self.stream.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_reports_diagnostics_on_bad_script() {
        let err = compile("y/ab/x/", Options::default()).unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn filter_resets_state_each_call() {
        let program = compile("1,/b/p", Options::default()).unwrap();
        let first = program.filter("a\nx\nb\nc").unwrap();
        let second = program.filter("a\nx\nb\nc").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn filter_streaming_carries_hold_space_across_chunks() {
        // Each chunk's output is handed back verbatim (no per-chunk
        // trailing-newline trim), so a driver can print it as-is.
        let program = compile("H;g", Options::default()).unwrap();
        let first = program.filter_streaming("one").unwrap();
        let second = program.filter_streaming("two").unwrap();
        assert_eq!(first, "\none\n");
        assert_eq!(second, "\none\ntwo\n");
    }

    #[test]
    fn filter_streaming_tracks_absolute_line_numbers() {
        let program = compile("=", Options::default()).unwrap();
        let first = program.filter_streaming("a").unwrap();
        let second = program.filter_streaming("b").unwrap();
        assert_eq!(first, "1\na\n");
        assert_eq!(second, "2\nb\n");
    }

    #[test]
    fn filter_streaming_emits_nothing_for_a_no_output_cycle() {
        // A deleted line (or `-n` with no `p`) must not leave a
        // spurious blank line behind once the driver stops adding its
        // own newline around each chunk's output.
        let program = compile("d", Options::default()).unwrap();
        assert_eq!(program.filter_streaming("line").unwrap(), "");
    }

    #[test]
    fn autoprint_law_holds_for_empty_program() {
        let program = compile("", Options::default()).unwrap();
        assert_eq!(program.filter("anything at all").unwrap(), "anything at all");
    }

    #[test]
    fn info_lexes_without_parsing() {
        let tokens = info("p");
        assert!(!tokens.is_empty());
    }

    #[test]
    fn leading_hash_n_suppresses_autoprint() {
        let program = compile("#n\np", Options::default()).unwrap();
        assert_eq!(program.filter("hello").unwrap(), "hello");
    }
}
