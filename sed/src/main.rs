//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use gettextrs::{bind_textdomain_codeset, setlocale, textdomain, LocaleCategory};
use plib::PROJECT_NAME;

use sed::{compile, Diagnostic, Options, RuntimeFailure};

#[derive(Parser, Debug)]
#[command(version, about = "sed - stream editor")]
struct Args {
    #[arg(short = 'E', help = "Match using extended regular expressions.")]
    ere: bool,

    #[arg(short = 'n', help = "Suppress the default output; only lines explicitly selected for output are written.")]
    quiet: bool,

    #[arg(short = 'e', help = "Add the editing commands in script to the end of the script of editing commands.")]
    script: Vec<String>,

    #[arg(short = 'f', value_name = "SCRIPT_FILE", help = "Add the editing commands in script_file to the end of the script of editing commands.")]
    script_file: Vec<PathBuf>,

    #[arg(help = "A pathname of a file whose contents are read and edited.")]
    file: Vec<String>,
}

impl Args {
    /// Reassembles `-e`/`-f` fragments in the order they appeared on
    /// the command line; `clap` alone loses that cross-flag ordering
    /// since it buckets each flag into its own `Vec`.
    fn get_raw_script() -> Result<String, CliError> {
        let mut fragments: Vec<String> = Vec::new();
        let cli_args: Vec<String> = std::env::args().skip(1).collect();
        let mut iter = cli_args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-e" => {
                    let script = iter.next().expect("-e already validated by clap");
                    fragments.extend(script.split('\n').map(str::to_owned));
                }
                "-f" => {
                    let path = iter.next().expect("-f already validated by clap");
                    let file = File::open(path).map_err(CliError::Io)?;
                    for line in BufReader::new(file).lines() {
                        fragments.push(line.map_err(CliError::Io)?);
                    }
                }
                _ => continue,
            }
        }
        Ok(fragments.join("\n"))
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("no script specified")]
    NoScript,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{}", join_diagnostics(.0))]
    Compile(Vec<Diagnostic>),
    #[error("{}", .0.error)]
    Runtime(RuntimeFailure),
}

fn join_diagnostics(diags: &[Diagnostic]) -> String {
    diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}

fn run(mut args: Args) -> Result<(), CliError> {
    let mut raw_script = Args::get_raw_script()?;

    if raw_script.is_empty() {
        if args.file.is_empty() {
            return Err(CliError::NoScript);
        }
        // Neither `-e` nor `-f` was given: the classic `sed script
        // [file...]` form treats the first positional argument as
        // the script itself.
        raw_script = args.file.remove(0);
    }

    let options = Options {
        suppress_autoprint: args.quiet,
        append_file: false,
        extended_regex: args.ere,
    };
    let program = compile(&raw_script, options).map_err(CliError::Compile)?;

    if args.file.is_empty() {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in stdin.lock().lines() {
            let line = line.map_err(CliError::Io)?;
            let output = program
                .filter_streaming(&line)
                .map_err(CliError::Runtime)?;
            write!(out, "{output}").map_err(CliError::Io)?;
        }
        return Ok(());
    }

    let mut combined = String::new();
    let file_count = args.file.len();
    for (i, path) in args.file.iter().enumerate() {
        let mut text = String::new();
        File::open(path)
            .map_err(CliError::Io)?
            .read_to_string(&mut text)
            .map_err(CliError::Io)?;
        if i + 1 < file_count {
            combined.push_str(text.trim_end_matches('\n'));
            combined.push('\n');
        } else {
            combined.push_str(&text);
        }
    }

    let output = program.filter(&combined).map_err(CliError::Runtime)?;
    print!("{output}");
    std::io::stdout().flush().map_err(CliError::Io)?;
    Ok(())
}

/// Exit codes: 0 success; 1 compile, runtime, or I/O error (message on
/// stderr).
fn main() {
    setlocale(LocaleCategory::LcAll, "");
    if let Err(e) = textdomain(PROJECT_NAME) {
        eprintln!("sed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = bind_textdomain_codeset(PROJECT_NAME, "UTF-8") {
        eprintln!("sed: {e}");
        std::process::exit(1);
    }

    let args = Args::parse();
    let exit_code = run(args).map(|_| 0).unwrap_or_else(|err| {
        eprintln!("sed: {err}");
        1
    });
    std::process::exit(exit_code);
}
