//! The execution engine: drives the pattern/hold spaces against a
//! compiled [`Program`], honoring per-command control directives,
//! range-address latching, and branching.
//!
//! Grounded in `original_source/ast/runtime.go`'s `Run` function (the
//! per-line loop, directive dispatch, final trailing-newline trim) and
//! `original_source/ast/ast.go`'s per-command `Run` methods. The
//! range-latch redesign (a flat `Vec<Cell<bool>>` keyed by a latch id
//! assigned at parse time, rather than mutable state on a shared
//! `Address`) follows the distilled spec's §9 design note; block
//! execution recurses into a nested `Program` directly rather than
//! slicing the input, per the same section.

use std::cell::Cell;
use std::path::Path;

use crate::ast::{Address, Command, Program, Statement};
use crate::error::{Result, RuntimeFailure};
use crate::fileio::FileIo;
use crate::regex_engine::substitute;

/// Settings that shape one `Run`: whether the default per-cycle
/// autoprint is suppressed (`-n`) and whether `w`-family file targets
/// truncate their previous contents on first open or preserve them
/// (the `append_file` option, §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub suppress_autoprint: bool,
    pub append_file: bool,
    /// Hint passed through to the regex capability: compile addresses
    /// and `s` patterns as ERE rather than BRE.
    pub extended_regex: bool,
}

/// Per-line control directive a command can raise, propagated up
/// through any enclosing blocks to the outermost per-line driver (only
/// label resolution for `b`/`t` stays scoped to the Program it was
/// issued in; see `Parser`'s label tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Next,
    Delete,
    Quit(bool),
    Restart,
}

enum CommandResult {
    Continue,
    Jump(String),
    Flow(Flow),
}

/// Per-file read cursor for `R`, which consumes its source one line
/// per invocation rather than all at once (unlike `r`).
struct RFileCursor {
    lines: Vec<String>,
    next: usize,
}

/// Mutable state for one `Run`, shared by the whole call tree
/// (including nested blocks): pattern/hold spaces, the append queue,
/// the line cursor, range latches, and the growing output.
struct Runtime<'a> {
    options: &'a Options,
    file_io: &'a mut dyn FileIo,
    lines: Vec<String>,
    line_no: usize,
    pattern: String,
    hold: String,
    append_buf: String,
    sub_made: bool,
    latches: Vec<Cell<bool>>,
    out: String,
    r_cursors: std::collections::HashMap<String, RFileCursor>,
    /// Absolute line number of `lines[0]` minus one, used for `=` and
    /// `Address::Line` in streaming mode where a chunk isn't the whole
    /// input. Zero for a plain, whole-input `Run`.
    line_offset: usize,
}

impl<'a> Runtime<'a> {
    /// `latches` must already be sized to the program's `range_count`
    /// (see [`StreamState::new`] and the plain-`Run` constructor below).
    fn new(
        options: &'a Options,
        file_io: &'a mut dyn FileIo,
        input: &str,
        hold: String,
        latches: Vec<Cell<bool>>,
        line_offset: usize,
    ) -> Self {
        Self {
            options,
            file_io,
            lines: input.split('\n').map(str::to_owned).collect(),
            line_no: 0,
            pattern: String::new(),
            hold,
            append_buf: String::new(),
            sub_made: false,
            latches,
            out: String::new(),
            r_cursors: std::collections::HashMap::new(),
            line_offset,
        }
    }

    fn at_last_line(&self) -> bool {
        self.line_no + 1 >= self.lines.len()
    }

    fn drive(&mut self, program: &Program) -> Result<()> {
        if self.lines.is_empty() {
            return Ok(());
        }
        self.pattern = self.lines[0].clone();
        loop {
            let flow = self.execute_program(program)?;
            match flow {
                Flow::Normal => {
                    self.finish_cycle(true, true);
                    if !self.advance_line() {
                        break;
                    }
                }
                Flow::Next => {
                    self.finish_cycle(true, false);
                    if !self.advance_line() {
                        break;
                    }
                }
                Flow::Delete => {
                    self.finish_cycle(false, true);
                    if !self.advance_line() {
                        break;
                    }
                }
                Flow::Quit(print) => {
                    self.finish_cycle(print, false);
                    break;
                }
                Flow::Restart => continue,
            }
        }
        Ok(())
    }

    fn advance_line(&mut self) -> bool {
        self.line_no += 1;
        if self.line_no >= self.lines.len() {
            false
        } else {
            self.pattern = self.lines[self.line_no].clone();
            self.sub_made = false;
            true
        }
    }

    fn finish_cycle(&mut self, autoprint_pattern: bool, flush_append: bool) {
        if autoprint_pattern && !self.options.suppress_autoprint {
            self.out.push_str(&self.pattern);
            self.out.push('\n');
        }
        if flush_append && !self.append_buf.is_empty() {
            self.out.push_str(&self.append_buf);
            self.append_buf.clear();
        }
    }

    fn address_matches(&self, addr: &Address) -> bool {
        match addr {
            Address::Every => true,
            Address::Line(n) => self.line_offset + self.line_no + 1 == *n,
            Address::Last => self.at_last_line(),
            Address::Regex(re) => re.is_match(&self.pattern),
            Address::Range(a1, a2, id) => {
                let latch = &self.latches[*id];
                if latch.get() {
                    if self.address_matches(a2) {
                        latch.set(false);
                    }
                    true
                } else if self.address_matches(a1) {
                    latch.set(true);
                    true
                } else {
                    false
                }
            }
            Address::Not(inner) => !self.address_matches(inner),
        }
    }

    fn statement_matches(&self, stmt: &Statement) -> bool {
        let base = match &stmt.address {
            None => true,
            Some(addr) => self.address_matches(addr),
        };
        if stmt.negated {
            !base
        } else {
            base
        }
    }

    /// For `c`'s range-aware semantics (§4.3): whether this is the
    /// last matching line of the address (true for any non-range
    /// address, since each match there is instantaneous).
    fn is_closing_match(&self, stmt: &Statement) -> bool {
        match &stmt.address {
            Some(Address::Range(_, _, id)) if !stmt.negated => !self.latches[*id].get() || self.at_last_line(),
            _ => true,
        }
    }

    fn execute_program(&mut self, program: &Program) -> Result<Flow> {
        let mut pc = 0;
        while pc < program.statements.len() {
            let stmt = &program.statements[pc];
            if !self.statement_matches(stmt) {
                pc += 1;
                continue;
            }
            let closing = self.is_closing_match(stmt);
            match self.execute_command(&stmt.command, closing)? {
                CommandResult::Continue => pc += 1,
                CommandResult::Jump(label) => {
                    pc = if label.is_empty() {
                        program.statements.len()
                    } else {
                        *program.labels.get(&label).unwrap_or(&program.statements.len())
                    };
                }
                CommandResult::Flow(flow) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_command(&mut self, command: &Command, closing: bool) -> Result<CommandResult> {
        use Command::*;
        Ok(match command {
            Append(text) => {
                self.append_buf.push_str(text);
                self.append_buf.push('\n');
                CommandResult::Continue
            }
            Branch(label) => CommandResult::Jump(label.clone()),
            Change(text) => {
                if closing {
                    self.out.push_str(text);
                    self.out.push('\n');
                }
                CommandResult::Flow(Flow::Delete)
            }
            Delete => CommandResult::Flow(Flow::Delete),
            DeleteFirstLine => match self.pattern.find('\n') {
                None => CommandResult::Flow(Flow::Delete),
                Some(idx) => {
                    self.pattern.drain(..=idx);
                    CommandResult::Flow(Flow::Restart)
                }
            },
            Get => {
                self.pattern = self.hold.clone();
                CommandResult::Continue
            }
            GetAppend => {
                self.pattern.push('\n');
                self.pattern.push_str(&self.hold);
                CommandResult::Continue
            }
            Hold => {
                self.hold = self.pattern.clone();
                CommandResult::Continue
            }
            HoldAppend => {
                self.hold.push('\n');
                self.hold.push_str(&self.pattern);
                CommandResult::Continue
            }
            Insert(text) => {
                self.out.push_str(text);
                self.out.push('\n');
                CommandResult::Continue
            }
            Next => CommandResult::Flow(Flow::Next),
            NextAppend => {
                if self.at_last_line() {
                    CommandResult::Flow(Flow::Quit(true))
                } else {
                    self.line_no += 1;
                    self.pattern.push('\n');
                    let line = self.lines[self.line_no].clone();
                    self.pattern.push_str(&line);
                    CommandResult::Continue
                }
            }
            Print => {
                self.out.push_str(&self.pattern);
                self.out.push('\n');
                CommandResult::Continue
            }
            PrintFirstLine => {
                match self.pattern.find('\n') {
                    Some(idx) => {
                        self.out.push_str(&self.pattern[..idx]);
                        self.out.push('\n');
                    }
                    None => self.out.push_str(&self.pattern),
                }
                CommandResult::Continue
            }
            Quit { print } => CommandResult::Flow(Flow::Quit(*print)),
            ReadFile(filename) => {
                let bytes = self.file_io.read_whole(Path::new(filename))?;
                self.append_buf.push_str(&String::from_utf8_lossy(&bytes));
                CommandResult::Continue
            }
            ReadLineFromFile(filename) => {
                if !self.r_cursors.contains_key(filename) {
                    let bytes = self.file_io.read_whole(Path::new(filename))?;
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    let lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
                    self.r_cursors.insert(filename.clone(), RFileCursor { lines, next: 0 });
                }
                let cursor = self.r_cursors.get_mut(filename).expect("just inserted");
                if cursor.next < cursor.lines.len() {
                    let line = cursor.lines[cursor.next].clone();
                    if !(cursor.next == cursor.lines.len() - 1 && line.is_empty()) {
                        self.append_buf.push_str(&line);
                        self.append_buf.push('\n');
                    }
                    cursor.next += 1;
                }
                CommandResult::Continue
            }
            Substitute { find, replace, flags } => {
                let (new_pattern, replaced) = substitute(find, &self.pattern, replace, flags.n, flags.global);
                if replaced {
                    self.pattern = new_pattern;
                    self.sub_made = true;
                    if flags.print {
                        self.out.push_str(&self.pattern);
                        self.out.push('\n');
                    }
                    if let Some(wfile) = &flags.write_file {
                        let mut bytes = self.pattern.clone().into_bytes();
                        bytes.push(b'\n');
                        self.file_io
                            .write_append(Path::new(wfile), &bytes, !self.options.append_file)?;
                    }
                }
                CommandResult::Continue
            }
            Test(label) => {
                if self.sub_made {
                    self.sub_made = false;
                    CommandResult::Jump(label.clone())
                } else {
                    CommandResult::Continue
                }
            }
            WriteFile(filename) => {
                let mut bytes = self.pattern.clone().into_bytes();
                bytes.push(b'\n');
                self.file_io
                    .write_append(Path::new(filename), &bytes, !self.options.append_file)?;
                CommandResult::Continue
            }
            WriteFirstLine(filename) => {
                let first = match self.pattern.find('\n') {
                    Some(idx) => &self.pattern[..idx],
                    None => &self.pattern[..],
                };
                let mut bytes = first.as_bytes().to_vec();
                bytes.push(b'\n');
                self.file_io
                    .write_append(Path::new(filename), &bytes, !self.options.append_file)?;
                CommandResult::Continue
            }
            Exchange => {
                std::mem::swap(&mut self.pattern, &mut self.hold);
                CommandResult::Continue
            }
            Transliterate(pairs) => {
                let mut next = String::with_capacity(self.pattern.len());
                for c in self.pattern.chars() {
                    match pairs.iter().find(|(from, _)| *from == c) {
                        Some((_, to)) => next.push(*to),
                        None => next.push(c),
                    }
                }
                self.pattern = next;
                CommandResult::Continue
            }
            Zap => {
                self.pattern.clear();
                CommandResult::Continue
            }
            LineNumber => {
                self.out.push_str(&(self.line_offset + self.line_no + 1).to_string());
                self.out.push('\n');
                CommandResult::Continue
            }
            Block(nested) => match self.execute_program(nested)? {
                Flow::Normal => CommandResult::Continue,
                other => CommandResult::Flow(other),
            },
        })
    }

    /// `trim` trims exactly one trailing `\n`, matching the outermost
    /// Run's final-newline rule (§4.4). A single chunk of a streaming
    /// Run is not the outermost Run, so `run_chunk` passes `false` and
    /// hands back its output verbatim; trimming per chunk would both
    /// lose a newline the caller is entitled to and, for a no-output
    /// cycle (`""`), have nothing to trim in the first place, leaving
    /// the caller to paper over the mismatch with its own newline.
    fn into_output(mut self, trim: bool) -> String {
        if trim && self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

/// Runs `program` against `input` once, with fresh state throughout
/// (latches reset, hold space empty). Returns whatever output had been
/// produced so far alongside the error if a runtime I/O command fails.
pub fn run(program: &Program, input: &str, options: &Options, file_io: &mut dyn FileIo) -> std::result::Result<String, RuntimeFailure> {
    let latches = (0..program.range_count).map(|_| Cell::new(false)).collect();
    let mut rt = Runtime::new(options, file_io, input, String::new(), latches, 0);
    match rt.drive(program) {
        Ok(()) => Ok(rt.into_output(true)),
        Err(error) => Err(RuntimeFailure {
            output: rt.into_output(true),
            error,
        }),
    }
}

/// Hold space, range latches, and an absolute line-number offset
/// carried between [`run_chunk`] calls, for hosts that feed the
/// runtime one chunk of input at a time (`Program::filter_streaming`).
///
/// A chunk boundary is a hard edge for `$` (last-line) addressing and
/// for `N`/`n` reading "the next line": neither can see past the
/// current chunk, so scripts relying on them should prefer
/// [`run`]/`Program::filter` with the whole input in hand.
pub struct StreamState {
    hold: String,
    latches: Vec<Cell<bool>>,
    line_offset: usize,
    /// Owned rather than borrowed: a streaming session's `w`/`W`
    /// targets must stay open (and truncate only once) across chunks,
    /// the same way a single whole-input `Run` would.
    file_io: crate::fileio::StdFileIo,
}

impl StreamState {
    pub fn new(range_count: usize) -> Self {
        Self {
            hold: String::new(),
            latches: (0..range_count).map(|_| Cell::new(false)).collect(),
            line_offset: 0,
            file_io: crate::fileio::StdFileIo::default(),
        }
    }
}

/// Runs `program` against one `chunk`, threading hold space, range
/// latches, open file handles, and the absolute line counter through
/// `state` so the next chunk continues where this one left off.
pub fn run_chunk(program: &Program, chunk: &str, options: &Options, state: &mut StreamState) -> std::result::Result<String, RuntimeFailure> {
    let hold = std::mem::take(&mut state.hold);
    let latches = std::mem::take(&mut state.latches);
    let line_offset = state.line_offset;
    let mut rt = Runtime::new(options, &mut state.file_io, chunk, hold, latches, line_offset);
    let lines_in_chunk = rt.lines.len();
    let result = rt.drive(program);
    state.hold = rt.hold.clone();
    state.latches = rt.latches.clone();
    state.line_offset += lines_in_chunk;
    match result {
        Ok(()) => Ok(rt.into_output(false)),
        Err(error) => Err(RuntimeFailure {
            output: rt.into_output(false),
            error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileio::StdFileIo;
    use crate::parser::parse;

    fn run_script(script: &str, input: &str, suppress_autoprint: bool) -> String {
        let (program, diags) = parse(script, false);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        let options = Options {
            suppress_autoprint,
            append_file: false,
            extended_regex: false,
        };
        let mut io = StdFileIo::default();
        run(&program, input, &options, &mut io).expect("run should succeed")
    }

    #[test]
    fn print_doubles_the_line() {
        assert_eq!(run_script("p", "hello", false), "hello\nhello");
    }

    #[test]
    fn delete_empties_every_line() {
        assert_eq!(run_script("d", "line1\nline2\nline3\nline4", false), "");
    }

    #[test]
    fn line_number_command() {
        assert_eq!(run_script("=", "hello\nworld", false), "1\nhello\n2\nworld");
    }

    #[test]
    fn substitute_global() {
        assert_eq!(run_script("s/a/b/g", "aaaaa", false), "bbbbb");
    }

    #[test]
    fn substitute_nth() {
        assert_eq!(run_script("s/a/b/2", "aaaaa", false), "abaaa");
    }

    #[test]
    fn block_runs_only_when_address_matches() {
        let script = "/here/{ s/here/HERE/; s/E/X/g }";
        let input = "---\nhere1\n---\nhere2";
        assert_eq!(run_script(script, input, false), "---\nHXRX1\n---\nHXRX2");
    }

    #[test]
    fn labels_and_t_loop_until_substitution_fails() {
        let script = ":x\ns/a/b/\ntx\n";
        assert_eq!(run_script(script, "aaa", false), "bbb");
    }

    #[test]
    fn n_command_joins_lines() {
        let script = r"/one\ntwo/s/one/ONE/";
        let input = "one\ntwo\nthree\nfour";
        let script_with_n = format!("N\n{script}");
        assert_eq!(run_script(&script_with_n, input, false), "ONE\ntwo\nthree\nfour");
    }

    #[test]
    fn range_change_emits_once_after_range_closes() {
        let script = "/START/,/END/c\\\nCHANGE";
        let input = "START\nhere2\nhere3\nhere4\nEND";
        assert_eq!(run_script(script, input, false), "CHANGE");
    }

    #[test]
    fn g_command_interleaves_blank_lines() {
        assert_eq!(
            run_script("G", "one\ntwo\nthree\nfour", false),
            "one\n\ntwo\n\nthree\n\nfour\n"
        );
    }

    #[test]
    fn hold_then_get_restores_pattern() {
        assert_eq!(run_script("h;g", "unchanged", false), "unchanged");
    }

    #[test]
    fn double_exchange_is_involution() {
        assert_eq!(run_script("x;x", "unchanged", false), "unchanged");
    }

    #[test]
    fn empty_program_is_identity_under_autoprint() {
        assert_eq!(run_script("", "a\nb\nc", false), "a\nb\nc");
    }

    #[test]
    fn suppress_autoprint_option() {
        assert_eq!(run_script("p", "a\nb", true), "a\nb");
    }

    #[test]
    fn range_latch_resets_between_runs() {
        let (program, diags) = parse("/a/,/b/p", false);
        assert!(diags.is_empty());
        let options = Options::default();
        let mut io = StdFileIo::default();
        let first = run(&program, "a\nx\nb\nc", &options, &mut io).unwrap();
        let second = run(&program, "a\nx\nb\nc", &options, &mut io).unwrap();
        assert_eq!(first, second);
    }
}
