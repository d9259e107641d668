//! End-to-end tests driving the compiled `sed` binary, grounded in
//! `text/tests/sed/mod.rs`'s harness shape (a thin wrapper over
//! `plib::testing::{TestPlan, run_test}`).

use plib::testing::{run_test, TestPlan};

fn sed_test(args: &[&str], stdin_data: &str, expected_out: &str, expected_err: &str, expected_exit_code: i32) {
    run_test(TestPlan {
        cmd: String::from("sed"),
        args: args.iter().map(|s| s.to_string()).collect(),
        stdin_data: stdin_data.to_string(),
        expected_out: expected_out.to_string(),
        expected_err: expected_err.to_string(),
        expected_exit_code,
    });
}

#[test]
fn quiet_print_selects_lines_from_stdin() {
    sed_test(&["-n", "-e", "p"], "hello\nworld\n", "hello\nworld\n", "", 0);
}

#[test]
fn default_autoprint_passes_input_through() {
    sed_test(&[""], "one\ntwo\nthree\n", "one\ntwo\nthree\n", "", 0);
}

#[test]
fn substitute_first_occurrence_on_each_stdin_line() {
    sed_test(&["s/o/0/"], "foo\nboo\n", "f0o\nb0o\n", "", 0);
}

#[test]
fn delete_from_stdin_emits_no_blank_lines() {
    sed_test(&["-e", "d"], "a\nb\n", "", "", 0);
}

#[test]
fn substitute_global_flag() {
    sed_test(&["s/o/0/g"], "foo\nboo\n", "f00\nb00\n", "", 0);
}

#[test]
fn e_and_plain_script_fragments_concatenate_in_order() {
    sed_test(&["-e", "s/a/b/", "-e", "s/b/c/"], "a\n", "c\n", "", 0);
}

#[test]
fn extended_regex_flag_enables_plus_metacharacter() {
    sed_test(&["-E", "s/a+/X/"], "aaab\n", "Xb\n", "", 0);
}

#[test]
fn first_positional_is_the_script_when_no_e_or_f_given() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.txt");
    std::fs::write(&path, "abc\ndef\n").unwrap();
    sed_test(&["s/b/B/", path.to_str().unwrap()], "", "aBc\ndef\n", "", 0);
}

#[test]
fn f_flag_reads_script_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("script.sed");
    std::fs::write(&script_path, "s/x/y/\n").unwrap();
    sed_test(&["-f", script_path.to_str().unwrap()], "x\n", "y\n", "", 0);
}

#[test]
fn no_script_is_an_error() {
    sed_test(&[], "", "", "no script specified", 1);
}

#[test]
fn mismatched_y_lengths_is_a_compile_error() {
    sed_test(&["y/ab/x/"], "", "", "", 1);
}

#[test]
fn multiple_input_files_are_joined_with_one_newline() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "one\n").unwrap();
    std::fs::write(&b, "two\n").unwrap();
    sed_test(&["", a.to_str().unwrap(), b.to_str().unwrap()], "", "one\ntwo\n", "", 0);
}
