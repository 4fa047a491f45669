// shellgate-core/src/backend/remote.rs

//! Operations expressed as POSIX shell commands and sent over SSH, one
//! connection per operation.

use super::{FsBackend, Listing, PathStatus, shell_quote};
use crate::config::RemoteSettings;
use crate::context::RemoteCredentials;
use crate::errors::{GateError, Result};
use crate::tools::{CommandOutput, ssh};
use async_trait::async_trait;
use tracing::debug;

/// Heredoc delimiter used by remote writes.
pub const HEREDOC_SENTINEL: &str = "SHELLGATE_EOF";

#[derive(Debug, Clone)]
pub struct RemoteBackend {
    creds: RemoteCredentials,
    settings: RemoteSettings,
}

impl RemoteBackend {
    /// Fails with `ConfigIncomplete` when host, username or password is empty,
    /// so no connection is ever attempted with partial credentials.
    pub fn new(creds: RemoteCredentials, settings: RemoteSettings) -> Result<Self> {
        creds.ensure_complete()?;
        Ok(Self { creds, settings })
    }

    async fn run(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput> {
        let dir = match cwd {
            Some(cwd) if !cwd.is_empty() => cwd,
            _ => self.creds.default_path.as_str(),
        };
        let full = with_cwd(command, dir);
        ssh::run_remote_command(&self.creds, &self.settings, &full).await
    }

    /// Like `run`, but a non-zero exit status becomes `RemoteCommand`.
    async fn run_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.run(command, None).await?;
        ensure_success(command, output)
    }
}

pub(crate) fn ensure_success(command: &str, output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        debug!(status = output.status, command = %command, "Remote command failed");
        Err(GateError::RemoteCommand {
            status: output.status,
            output: output.combined(),
        })
    }
}

/// Prefixes `command` with a change into `dir` when one is set.
pub(crate) fn with_cwd(command: &str, dir: &str) -> String {
    if dir.is_empty() {
        command.to_string()
    } else {
        format!("cd {} || exit 1\n{}", shell_quote(dir), command)
    }
}

pub(crate) fn list_command(dir: &str, default_path: &str) -> String {
    let target = if !dir.is_empty() && dir != "." {
        shell_quote(dir)
    } else if !default_path.is_empty() {
        shell_quote(default_path)
    } else {
        "~".to_string()
    };
    format!("ls -la {}", target)
}

pub(crate) fn write_command(path: &str, content: &str) -> Result<String> {
    if content.lines().any(|line| line == HEREDOC_SENTINEL) {
        return Err(GateError::InvalidArguments(format!(
            "content contains a line equal to the heredoc delimiter {}",
            HEREDOC_SENTINEL
        )));
    }
    let quoted = shell_quote(path);
    let separator = if content.is_empty() || content.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    Ok(format!(
        "mkdir -p \"$(dirname {quoted})\" 2>/dev/null; cat > {quoted} << '{HEREDOC_SENTINEL}'\n{content}{separator}{HEREDOC_SENTINEL}"
    ))
}

pub(crate) fn remove_command(path: &str, recursive: bool) -> String {
    let quoted = shell_quote(path);
    if recursive {
        format!("rm -rf {}", quoted)
    } else {
        format!("if [ -d {q} ]; then rmdir {q}; else rm {q}; fi", q = quoted)
    }
}

pub(crate) fn mkdir_command(path: &str, recursive: bool) -> String {
    if recursive {
        format!("mkdir -p {}", shell_quote(path))
    } else {
        format!("mkdir {}", shell_quote(path))
    }
}

pub(crate) fn exists_command(path: &str) -> String {
    format!(
        "[ -e {} ] && echo EXISTS || echo NOT_EXISTS",
        shell_quote(path)
    )
}

/// Exact match, so `NOT_EXISTS` never counts as a hit.
pub(crate) fn parse_exists(stdout: &str) -> bool {
    stdout.trim() == "EXISTS"
}

#[async_trait]
impl FsBackend for RemoteBackend {
    async fn exec(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput> {
        self.run(command, cwd).await
    }

    async fn list_dir(&self, dir: &str) -> Result<Listing> {
        let output = self
            .run_checked(&list_command(dir, &self.creds.default_path))
            .await?;
        Ok(Listing::Raw(output.combined()))
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let output = self
            .run_checked(&format!("cat {}", shell_quote(path)))
            .await?;
        Ok(output.stdout)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.run_checked(&write_command(path, content)?).await?;
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.run_checked(&format!(
            "mv {} {}",
            shell_quote(old_path),
            shell_quote(new_path)
        ))
        .await?;
        Ok(())
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        self.run_checked(&remove_command(path, recursive)).await?;
        Ok(())
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        self.run_checked(&mkdir_command(path, recursive)).await?;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<PathStatus> {
        // The test itself always exits 0; a failure means the cd prefix did.
        let output = self.run_checked(&exists_command(path)).await?;
        Ok(PathStatus {
            exists: parse_exists(&output.stdout),
            ..Default::default()
        })
    }

    async fn pwd(&self) -> Result<String> {
        let output = self.run_checked("pwd").await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn cd(&self, dir: &str) -> Result<String> {
        // Not verified remotely; the next command fails if the path is bad.
        Ok(dir.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::shell::execute_shell_command;
    use std::path::Path;
    use tempfile::tempdir;

    fn creds() -> RemoteCredentials {
        RemoteCredentials {
            host: "203.0.113.5".to_string(),
            port: 2200,
            username: "root".to_string(),
            password: "secret".to_string(),
            default_path: "/srv/app".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_incomplete_credentials() {
        let mut incomplete = creds();
        incomplete.password.clear();
        let result = RemoteBackend::new(incomplete, RemoteSettings::default());
        assert!(matches!(result, Err(GateError::ConfigIncomplete(ref m)) if m == "password"));
        assert!(RemoteBackend::new(creds(), RemoteSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_cd_records_path_without_connecting() {
        let backend = RemoteBackend::new(creds(), RemoteSettings::default()).unwrap();
        assert_eq!(backend.cd("/opt/elsewhere").await.unwrap(), "/opt/elsewhere");
    }

    #[test]
    fn test_with_cwd() {
        assert_eq!(with_cwd("pwd", ""), "pwd");
        assert_eq!(with_cwd("pwd", "/srv/my app"), "cd '/srv/my app' || exit 1\npwd");
    }

    #[test]
    fn test_list_command_fallbacks() {
        assert_eq!(list_command("/etc", "/srv/app"), "ls -la '/etc'");
        assert_eq!(list_command(".", "/srv/app"), "ls -la '/srv/app'");
        assert_eq!(list_command("", "/srv/app"), "ls -la '/srv/app'");
        assert_eq!(list_command(".", ""), "ls -la ~");
    }

    #[test]
    fn test_write_command_uses_quoted_heredoc() {
        let command = write_command("/tmp/a b.txt", "say \"$HOME\"").unwrap();
        assert_eq!(
            command,
            "mkdir -p \"$(dirname '/tmp/a b.txt')\" 2>/dev/null; \
             cat > '/tmp/a b.txt' << 'SHELLGATE_EOF'\nsay \"$HOME\"\nSHELLGATE_EOF"
        );
    }

    #[test]
    fn test_write_command_keeps_existing_trailing_newline() {
        let command = write_command("f", "line\n").unwrap();
        assert!(command.ends_with("'SHELLGATE_EOF'\nline\nSHELLGATE_EOF"));
        let command = write_command("f", "").unwrap();
        assert!(command.ends_with("'SHELLGATE_EOF'\nSHELLGATE_EOF"));
    }

    #[test]
    fn test_write_command_rejects_sentinel_line() {
        let result = write_command("f", "before\nSHELLGATE_EOF\nafter");
        assert!(matches!(result, Err(GateError::InvalidArguments(_))));
    }

    #[test]
    fn test_remove_command_parity() {
        assert_eq!(remove_command("/d", true), "rm -rf '/d'");
        assert_eq!(
            remove_command("/d", false),
            "if [ -d '/d' ]; then rmdir '/d'; else rm '/d'; fi"
        );
    }

    #[test]
    fn test_mkdir_and_exists_commands() {
        assert_eq!(mkdir_command("/a/b", true), "mkdir -p '/a/b'");
        assert_eq!(mkdir_command("/a/b", false), "mkdir '/a/b'");
        assert_eq!(
            exists_command("/a"),
            "[ -e '/a' ] && echo EXISTS || echo NOT_EXISTS"
        );
    }

    #[test]
    fn test_parse_exists_is_exact() {
        assert!(parse_exists("EXISTS\n"));
        assert!(!parse_exists("NOT_EXISTS\n"));
        assert!(!parse_exists(""));
    }

    #[test]
    fn test_with_cwd_keeps_home_expansion() {
        assert_eq!(with_cwd("pwd", "~/app"), "cd ~/'app' || exit 1\npwd");
    }

    #[tokio::test]
    async fn test_exists_check_fails_when_default_dir_is_gone() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone").display().to_string();
        let command = with_cwd(&exists_command("/"), &missing);
        let output = execute_shell_command(&command, dir.path()).await.unwrap();

        let result = ensure_success(&command, output);
        assert!(
            matches!(result, Err(GateError::RemoteCommand { status, .. }) if status != 0),
            "unexpected result: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_exists_check_runs_from_default_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("present.txt"), "x").unwrap();
        let default_dir = dir.path().display().to_string();

        let hit = with_cwd(&exists_command("present.txt"), &default_dir);
        let output = execute_shell_command(&hit, Path::new("/")).await.unwrap();
        assert!(parse_exists(&ensure_success(&hit, output).unwrap().stdout));

        let miss = with_cwd(&exists_command("absent.txt"), &default_dir);
        let output = execute_shell_command(&miss, Path::new("/")).await.unwrap();
        assert!(!parse_exists(&ensure_success(&miss, output).unwrap().stdout));
    }
}
