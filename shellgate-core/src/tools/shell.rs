// shellgate-core/src/tools/shell.rs

//! Local command execution through the platform shell.

use super::CommandOutput;
use crate::errors::{GateError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Executes a shell command string in `working_dir`.
///
/// Uses `sh -c` on Unix and `cmd /C` on Windows. Stdout, stderr and the exit
/// status are captured; a non-zero status is not an error here; callers
/// decide what to do with it.
///
/// **Warning:** the command is executed as provided, with no sandboxing.
pub async fn execute_shell_command(command: &str, working_dir: &Path) -> Result<CommandOutput> {
    debug!(command = %command, cwd = %working_dir.display(), "Executing local shell command");

    let shell_executable = if cfg!(target_os = "windows") {
        "cmd"
    } else {
        "sh"
    };
    let shell_arg = if cfg!(target_os = "windows") {
        "/C"
    } else {
        "-c"
    };

    let output = Command::new(shell_executable)
        .current_dir(working_dir)
        .arg(shell_arg)
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            warn!(command = %command, error = %e, "Failed to spawn command process");
            GateError::io(
                format!("Failed to run command in {}", working_dir.display()),
                e,
            )
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let status = output.status.code().unwrap_or(-1);

    debug!(
        "Local command exit status: {}\nStdout preview (first 3 lines):\n{}\nStderr preview (first 3 lines):\n{}",
        status,
        stdout.lines().take(3).collect::<Vec<_>>().join("\n"),
        stderr.lines().take(3).collect::<Vec<_>>().join("\n")
    );

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}
