// shellgate-core/src/lib.rs

//! Core of the shellgate MCP server.
//!
//! A [`Router`] holds the active execution context (local, remote shell, or
//! hosted repository) and sends each filesystem or shell [`Operation`] to the
//! matching [`FsBackend`](backend::FsBackend). The local backend calls the OS
//! directly; the remote backend turns each operation into a shell command and
//! runs it over a one-shot SSH session.

pub mod backend;
pub mod config;
pub mod context;
pub mod errors;
pub mod ops;
pub mod router;
pub mod tools;


pub use config::GateConfig;
pub use context::{ContextKind, ContextState, HostedRepoCoordinates, RemoteCredentials};
pub use errors::GateError;
pub use ops::Operation;
pub use router::Router;
pub use tools::CommandOutput;
