// shellgate-core/src/tools/mod.rs

//! The two command executors the backends build on: a local shell and a
//! one-shot SSH session.
//!
//! **Important:** neither executor sandboxes or validates the command it is
//! given. Whatever the caller passes runs with the privileges of the server
//! process (locally) or of the configured remote user.

pub mod shell;
pub mod ssh;

/// Represents the structured output of an executed command, local or remote.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// The exit status code of the command (`-1` when none was reported).
    pub status: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Checks if the command executed successfully (status code 0).
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Standard output followed by standard error, trimmed.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }

    /// `combined()` plus an `[exit code: N]` line when the command failed.
    pub fn report(&self) -> String {
        let combined = self.combined();
        if self.success() {
            combined
        } else if combined.is_empty() {
            format!("[exit code: {}]", self.status)
        } else {
            format!("{}\n[exit code: {}]", combined, self.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(status: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_combined_concatenates_and_trims() {
        let out = output(0, "  hello\n", "warn\n\n");
        assert_eq!(out.combined(), "hello\nwarn");
        assert_eq!(out.report(), "hello\nwarn");
    }

    #[test]
    fn test_report_appends_exit_code_on_failure() {
        assert_eq!(output(2, "", "boom\n").report(), "boom\n[exit code: 2]");
        assert_eq!(output(1, "", "").report(), "[exit code: 1]");
    }
}
