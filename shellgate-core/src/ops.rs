// shellgate-core/src/ops.rs

//! The tool catalog: decoding tool arguments into an [`Operation`] and
//! running it against the [`Router`].
//!
//! [`Router::perform`] is the failure boundary. Whatever goes wrong inside
//! an operation comes back as descriptive text, never as an error value;
//! only an unknown tool name or undecodable arguments are rejected earlier,
//! by [`Operation::from_tool_call`].

use crate::backend::PathStatus;
use crate::context::ContextKind;
use crate::errors::{GateError, Result};
use crate::router::Router;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const GET_CONFIG: &str = "get_config";
pub const TERMINAL_EXEC: &str = "terminal_exec";
pub const TERMINAL_LIST_DIR: &str = "terminal_list_dir";
pub const TERMINAL_READ_FILE: &str = "terminal_read_file";
pub const TERMINAL_WRITE_FILE: &str = "terminal_write_file";
pub const TERMINAL_RENAME: &str = "terminal_rename";
pub const TERMINAL_REMOVE: &str = "terminal_remove";
pub const TERMINAL_MKDIR: &str = "terminal_mkdir";
pub const TERMINAL_EXISTS: &str = "terminal_exists";
pub const TERMINAL_PWD: &str = "terminal_pwd";
pub const TERMINAL_CD: &str = "terminal_cd";
pub const SET_CONTEXT: &str = "set_context";

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    GetConfig,
    Exec { command: String, cwd: Option<String> },
    ListDir { dir: String },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    Rename { old_path: String, new_path: String },
    Remove { path: String, recursive: bool },
    Mkdir { path: String, recursive: bool },
    Exists { path: String },
    Pwd,
    Cd { dir: String },
    SetContext { kind: ContextKind, config: Option<String> },
}

#[derive(Deserialize)]
struct ExecArgs {
    command: String,
    #[serde(default)]
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct ListDirArgs {
    #[serde(default = "default_dir")]
    dir: String,
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct RenameArgs {
    old_path: String,
    new_path: String,
}

#[derive(Deserialize)]
struct RemoveArgs {
    path: String,
    #[serde(default)]
    recursive: bool,
}

#[derive(Deserialize)]
struct MkdirArgs {
    path: String,
    #[serde(default = "default_true")]
    recursive: bool,
}

#[derive(Deserialize)]
struct CdArgs {
    dir: String,
}

#[derive(Deserialize)]
struct SetContextArgs {
    #[serde(rename = "type")]
    kind: ContextKind,
    #[serde(default)]
    config: Option<String>,
}

fn default_dir() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn decode<T: DeserializeOwned>(tool: &str, args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| GateError::InvalidArguments(format!("{}: {}", tool, e)))
}

impl Operation {
    /// Builds an operation from a tool name and its (possibly absent) arguments.
    pub fn from_tool_call(name: &str, arguments: Option<Map<String, Value>>) -> Result<Operation> {
        let args = arguments.unwrap_or_default();
        let op = match name {
            GET_CONFIG => Operation::GetConfig,
            TERMINAL_EXEC => {
                let a: ExecArgs = decode(name, args)?;
                Operation::Exec {
                    command: a.command,
                    cwd: a.cwd,
                }
            }
            TERMINAL_LIST_DIR => {
                let a: ListDirArgs = decode(name, args)?;
                Operation::ListDir { dir: a.dir }
            }
            TERMINAL_READ_FILE => {
                let a: PathArgs = decode(name, args)?;
                Operation::ReadFile { path: a.path }
            }
            TERMINAL_WRITE_FILE => {
                let a: WriteFileArgs = decode(name, args)?;
                Operation::WriteFile {
                    path: a.path,
                    content: a.content,
                }
            }
            TERMINAL_RENAME => {
                let a: RenameArgs = decode(name, args)?;
                Operation::Rename {
                    old_path: a.old_path,
                    new_path: a.new_path,
                }
            }
            TERMINAL_REMOVE => {
                let a: RemoveArgs = decode(name, args)?;
                Operation::Remove {
                    path: a.path,
                    recursive: a.recursive,
                }
            }
            TERMINAL_MKDIR => {
                let a: MkdirArgs = decode(name, args)?;
                Operation::Mkdir {
                    path: a.path,
                    recursive: a.recursive,
                }
            }
            TERMINAL_EXISTS => {
                let a: PathArgs = decode(name, args)?;
                Operation::Exists { path: a.path }
            }
            TERMINAL_PWD => Operation::Pwd,
            TERMINAL_CD => {
                let a: CdArgs = decode(name, args)?;
                Operation::Cd { dir: a.dir }
            }
            SET_CONTEXT => {
                let a: SetContextArgs = decode(name, args)?;
                Operation::SetContext {
                    kind: a.kind,
                    config: a.config,
                }
            }
            other => return Err(GateError::UnknownTool(other.to_string())),
        };
        Ok(op)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Operation::GetConfig => GET_CONFIG,
            Operation::Exec { .. } => TERMINAL_EXEC,
            Operation::ListDir { .. } => TERMINAL_LIST_DIR,
            Operation::ReadFile { .. } => TERMINAL_READ_FILE,
            Operation::WriteFile { .. } => TERMINAL_WRITE_FILE,
            Operation::Rename { .. } => TERMINAL_RENAME,
            Operation::Remove { .. } => TERMINAL_REMOVE,
            Operation::Mkdir { .. } => TERMINAL_MKDIR,
            Operation::Exists { .. } => TERMINAL_EXISTS,
            Operation::Pwd => TERMINAL_PWD,
            Operation::Cd { .. } => TERMINAL_CD,
            Operation::SetContext { .. } => SET_CONTEXT,
        }
    }
}

fn failure(action: &str, e: GateError) -> String {
    warn!(action, error = %e, "Operation failed");
    format!("Error {}: {}", action, e)
}

fn reply<T>(result: Result<T>, action: &str, ok: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => ok(value),
        Err(e) => failure(action, e),
    }
}

impl Router {
    /// Runs `op` and renders the outcome as text. Never fails.
    pub async fn perform(&self, op: Operation) -> String {
        info!(tool = op.tool_name(), "Handling tool call");
        match op {
            Operation::GetConfig => self.config_report().await,
            Operation::Exec { command, cwd } => reply(
                self.exec(&command, cwd.as_deref()).await,
                "executing command",
                |output| output.report(),
            ),
            Operation::ListDir { dir } => reply(
                self.list_dir(&dir).await,
                "listing directory",
                |listing| listing.render(),
            ),
            Operation::ReadFile { path } => {
                reply(self.read_file(&path).await, "reading file", |content| content)
            }
            Operation::WriteFile { path, content } => reply(
                self.write_file(&path, &content).await,
                "writing file",
                |()| format!("File written: {}", path),
            ),
            Operation::Rename { old_path, new_path } => reply(
                self.rename(&old_path, &new_path).await,
                "renaming",
                |()| format!("Renamed: {} -> {}", old_path, new_path),
            ),
            Operation::Remove { path, recursive } => reply(
                self.remove(&path, recursive).await,
                "removing",
                |()| format!("Removed: {}", path),
            ),
            Operation::Mkdir { path, recursive } => reply(
                self.mkdir(&path, recursive).await,
                "creating directory",
                |()| format!("Directory created: {}", path),
            ),
            Operation::Exists { path } => self
                .stat(&path)
                .await
                .unwrap_or_else(|e| PathStatus::missing(e.to_string()))
                .render(),
            Operation::Pwd => reply(self.pwd().await, "getting working directory", |dir| dir),
            Operation::Cd { dir } => reply(
                self.cd(&dir).await,
                "changing directory",
                |(kind, new_dir)| match kind {
                    ContextKind::Remote => {
                        format!("Default remote directory changed to: {}", new_dir)
                    }
                    ContextKind::Local | ContextKind::HostedRepo => {
                        format!("Working directory changed to: {}", new_dir)
                    }
                },
            ),
            Operation::SetContext { kind, config } => reply(
                self.set_context(kind, config.as_deref()).await,
                "switching context",
                |message| message,
            ),
        }
    }
}
