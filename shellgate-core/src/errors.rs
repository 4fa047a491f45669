// shellgate-core/src/errors.rs
use thiserror::Error;

/// Errors that can occur while routing or executing an operation.
#[derive(Error, Debug)]
pub enum GateError {
    /// A remote field the operation needs is empty.
    #[error("Remote shell configuration incomplete: missing {0}")]
    ConfigIncomplete(String),

    /// A configuration string did not match its grammar.
    #[error("Invalid format. Use: {expected}")]
    InvalidFormat { expected: String },

    /// The remote transport could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A remote command ran but exited non-zero.
    #[error("Remote command failed (exit code {status}): {output}")]
    RemoteCommand { status: i32, output: String },

    /// A local OS call failed.
    #[error("{action}: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments could not be decoded.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Startup configuration could not be loaded or validated.
    #[error("Configuration Error: {0}")]
    Config(String),
}

impl GateError {
    pub fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        GateError::Io {
            action: action.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GateError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
