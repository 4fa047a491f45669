// shellgate-core/src/backend/mod.rs

//! The filesystem/shell capability contract and its two implementations.
//!
//! A backend is built fresh for every invocation from a snapshot of the
//! router's [`ContextState`](crate::context::ContextState); it never mutates
//! that state itself. Operations that move the working directory return the
//! new value and the router commits it.

pub mod local;
pub mod remote;

use crate::errors::Result;
use crate::tools::CommandOutput;
use async_trait::async_trait;
use serde::Serialize;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

#[async_trait]
pub trait FsBackend: Send + Sync {
    /// Runs a shell command, in `cwd` when given, else in the backend's default directory.
    async fn exec(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput>;
    async fn list_dir(&self, dir: &str) -> Result<Listing>;
    async fn read_file(&self, path: &str) -> Result<String>;
    /// Writes `content`, creating missing parent directories on a best-effort basis.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()>;
    /// Non-recursive removal of a non-empty directory must fail.
    async fn remove(&self, path: &str, recursive: bool) -> Result<()>;
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()>;
    async fn stat(&self, path: &str) -> Result<PathStatus>;
    async fn pwd(&self) -> Result<String>;
    /// Returns the directory the caller should record as the new default.
    async fn cd(&self, dir: &str) -> Result<String>;
}

/// A directory listing. Locally we have structured entries; remotely only
/// the text of `ls -la`.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Entries(Vec<DirEntryInfo>),
    Raw(String),
}

impl Listing {
    pub fn render(&self) -> String {
        match self {
            Listing::Entries(entries) => {
                serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
            }
            Listing::Raw(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntryInfo {
    pub name: String,
    pub is_directory: bool,
    pub path: String,
}

/// Result of an existence check. Remote checks only ever fill `exists`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStatus {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_file: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathStatus {
    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            exists: false,
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{{\"exists\": {}}}", self.exists))
    }
}

/// Single-quotes `value` for a POSIX shell. A leading `~` or `~/` is left
/// bare so it still expands to the home directory.
pub fn shell_quote(value: &str) -> String {
    if value == "~" {
        return value.to_string();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        if rest.is_empty() {
            return value.to_string();
        }
        return format!("~/{}", quote_literal(rest));
    }
    quote_literal(value)
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
