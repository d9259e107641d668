//! Shared support code for the posixutils-rs workspace: a project-wide
//! name constant and a small harness used by each utility's integration
//! tests to drive the compiled binary and assert on its output.

pub const PROJECT_NAME: &str = "posixutils-rs";

pub mod testing {
    use std::ffi::OsStr;
    use std::io::Write;
    use std::process::{Command, Stdio};

    /// Describes one invocation of a compiled utility binary: the
    /// arguments to pass, the bytes to feed on stdin, and the expected
    /// stdout/stderr/exit-code.
    pub struct TestPlan {
        pub cmd: String,
        pub args: Vec<String>,
        pub stdin_data: String,
        pub expected_out: String,
        pub expected_err: String,
        pub expected_exit_code: i32,
    }

    /// Runs the binary named by `plan.cmd` (resolved via `CARGO_BIN_EXE_<cmd>`
    /// when available, falling back to a bare name on `PATH`), feeds it
    /// `plan.stdin_data`, and asserts its stdout, stderr, and exit code
    /// match the plan.
    pub fn run_test(plan: TestPlan) {
        let bin = resolve_bin(&plan.cmd);

        let mut child = Command::new(bin)
            .args(plan.args.iter().map(OsStr::new))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap_or_else(|e| panic!("failed to spawn {}: {e}", plan.cmd));

        child
            .stdin
            .take()
            .expect("child stdin")
            .write_all(plan.stdin_data.as_bytes())
            .expect("failed to write stdin");

        let output = child.wait_with_output().expect("failed to wait on child");

        let actual_out = String::from_utf8_lossy(&output.stdout).into_owned();
        let actual_err = String::from_utf8_lossy(&output.stderr).into_owned();

        assert_eq!(actual_out, plan.expected_out, "stdout mismatch for {}", plan.cmd);
        if !plan.expected_err.is_empty() {
            assert!(
                actual_err.contains(&plan.expected_err),
                "stderr {actual_err:?} does not contain {:?}",
                plan.expected_err
            );
        }
        assert_eq!(
            output.status.code(),
            Some(plan.expected_exit_code),
            "exit code mismatch for {}",
            plan.cmd
        );
    }

    fn resolve_bin(cmd: &str) -> String {
        let env_var = format!("CARGO_BIN_EXE_{cmd}");
        std::env::var(env_var).unwrap_or_else(|_| cmd.to_string())
    }
}
