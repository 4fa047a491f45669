// shellgate-core/src/context.rs

//! Execution context model and the configuration-string grammars used by
//! `set_context`.

use crate::errors::{GateError, Result};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DEFAULT_SSH_PORT: u16 = 22;
const NOT_CONFIGURED: &str = "not configured";
const REMOTE_FORMAT: &str = "set_context ssh user:password@host[:port] [/remote/path]";
const HOSTED_REPO_FORMAT: &str = "set_context github owner/repo";

/// Where filesystem and shell operations run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    #[default]
    Local,
    #[serde(rename = "ssh", alias = "remote")]
    Remote,
    #[serde(rename = "github", alias = "hosted_repo")]
    HostedRepo,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Local => "local",
            ContextKind::Remote => "ssh",
            ContextKind::HostedRepo => "github",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials and default path for the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub default_path: String,
}

impl Default for RemoteCredentials {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SSH_PORT,
            username: String::new(),
            password: String::new(),
            default_path: String::new(),
        }
    }
}

impl RemoteCredentials {
    /// Fails with `ConfigIncomplete` naming every empty required field.
    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GateError::ConfigIncomplete(missing.join(", ")))
        }
    }

    /// `user@host:port`, never including the password.
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostedRepoCoordinates {
    pub owner: String,
    pub repo: String,
}

/// The full routing state. The router owns one of these and hands out clones.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextState {
    pub kind: ContextKind,
    pub remote: RemoteCredentials,
    pub hosted_repo: HostedRepoCoordinates,
    pub hosted_repo_token: String,
    pub local_work_dir: PathBuf,
}

impl ContextState {
    pub fn new(local_work_dir: PathBuf, hosted_repo_token: String) -> Self {
        Self {
            kind: ContextKind::Local,
            remote: RemoteCredentials::default(),
            hosted_repo: HostedRepoCoordinates::default(),
            hosted_repo_token,
            local_work_dir,
        }
    }

    /// Human-readable report with the token and password masked.
    pub fn masked_report(&self) -> String {
        let token = mask_token(&self.hosted_repo_token);
        let password = if self.remote.password.is_empty() {
            NOT_CONFIGURED.to_string()
        } else {
            "******".to_string()
        };
        format!(
            "Current shellgate configuration:\n\n\
             Context: {}\n\n\
             Hosted repository:\n\
             - Repository: {}/{}\n\
             - Token: {}\n\n\
             Remote shell:\n\
             - Server: {}@{}:{}\n\
             - Password: {}\n\
             - Default path: {}\n\n\
             Local:\n\
             - Working directory: {}",
            self.kind,
            or_unset(&self.hosted_repo.owner),
            or_unset(&self.hosted_repo.repo),
            token,
            or_unset(&self.remote.username),
            or_unset(&self.remote.host),
            self.remote.port,
            password,
            or_unset(&self.remote.default_path),
            self.local_work_dir.display(),
        )
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { NOT_CONFIGURED } else { value }
}

/// `***` followed by the last four characters, or `not configured`.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return NOT_CONFIGURED.to_string();
    }
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{}", tail)
}

fn remote_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^:\s]+):([^@]+)@([^:\s]+)(?::(\d+))?(?:\s+(.*))?$")
            .expect("remote pattern is valid")
    })
}

fn hosted_repo_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^/]+)/([^/]+)$").expect("repo pattern is valid"))
}

/// Parses `user:password@host[:port][ path]`.
pub fn parse_remote_spec(input: &str) -> Result<RemoteCredentials> {
    let invalid = || GateError::InvalidFormat {
        expected: REMOTE_FORMAT.to_string(),
    };
    let caps = remote_pattern().captures(input.trim()).ok_or_else(invalid)?;
    let port = match caps.get(4) {
        Some(m) => m.as_str().parse::<u16>().map_err(|_| invalid())?,
        None => DEFAULT_SSH_PORT,
    };
    Ok(RemoteCredentials {
        username: caps[1].to_string(),
        password: caps[2].to_string(),
        host: caps[3].to_string(),
        port,
        default_path: caps
            .get(5)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

/// Parses `owner/repo`.
pub fn parse_hosted_repo(input: &str) -> Result<HostedRepoCoordinates> {
    let caps = hosted_repo_pattern()
        .captures(input.trim())
        .ok_or_else(|| GateError::InvalidFormat {
            expected: HOSTED_REPO_FORMAT.to_string(),
        })?;
    Ok(HostedRepoCoordinates {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}
