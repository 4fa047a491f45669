// shellgate-core/src/router.rs

//! The execution router: owns the context state and picks a backend for
//! every operation.

use crate::backend::{FsBackend, Listing, LocalBackend, PathStatus, RemoteBackend};
use crate::config::{GateConfig, RemoteSettings};
use crate::context::{ContextKind, ContextState, parse_hosted_repo, parse_remote_spec};
use crate::errors::{GateError, Result};
use crate::tools::{CommandOutput, ssh};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PROBE_COMMAND: &str = "echo 'shellgate: connection established'";

/// Routes operations to the local or remote backend.
///
/// The state lock is held for the whole of each operation, so invocations
/// run one at a time and a backend never sees the state change underneath it.
#[derive(Debug)]
pub struct Router {
    state: Mutex<ContextState>,
    remote_settings: RemoteSettings,
}

impl Router {
    /// Starts in the Local context at the process working directory.
    pub fn new(config: &GateConfig) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| GateError::io("Failed to read the current directory", e))?;
        Ok(Self::with_state(
            ContextState::new(cwd, config.hosted_repo_token()),
            config.remote.clone(),
        ))
    }

    pub fn with_state(state: ContextState, remote_settings: RemoteSettings) -> Self {
        Self {
            state: Mutex::new(state),
            remote_settings,
        }
    }

    pub async fn snapshot(&self) -> ContextState {
        self.state.lock().await.clone()
    }

    fn backend_for(&self, state: &ContextState) -> Result<Box<dyn FsBackend>> {
        match state.kind {
            ContextKind::Remote => Ok(Box::new(RemoteBackend::new(
                state.remote.clone(),
                self.remote_settings.clone(),
            )?)),
            // Hosted-repo coordinates are not wired to any operation; run locally.
            ContextKind::Local | ContextKind::HostedRepo => {
                Ok(Box::new(LocalBackend::new(state.local_work_dir.clone())))
            }
        }
    }

    pub async fn exec(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput> {
        let state = self.state.lock().await;
        debug!(context = %state.kind, command = %command, "Routing exec");
        self.backend_for(&state)?.exec(command, cwd).await
    }

    pub async fn list_dir(&self, dir: &str) -> Result<Listing> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.list_dir(dir).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.read_file(path).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.write_file(path, content).await
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.rename(old_path, new_path).await
    }

    pub async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.remove(path, recursive).await
    }

    pub async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.mkdir(path, recursive).await
    }

    pub async fn stat(&self, path: &str) -> Result<PathStatus> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.stat(path).await
    }

    pub async fn pwd(&self) -> Result<String> {
        let state = self.state.lock().await;
        self.backend_for(&state)?.pwd().await
    }

    /// Changes the working directory of the active context and records it.
    /// Returns the context it applied to and the recorded directory.
    pub async fn cd(&self, dir: &str) -> Result<(ContextKind, String)> {
        let mut state = self.state.lock().await;
        let new_dir = self.backend_for(&state)?.cd(dir).await?;
        match state.kind {
            ContextKind::Remote => state.remote.default_path = new_dir.clone(),
            ContextKind::Local | ContextKind::HostedRepo => {
                state.local_work_dir = PathBuf::from(&new_dir)
            }
        }
        Ok((state.kind, new_dir))
    }

    /// Switches the active context.
    ///
    /// Configuration strings are validated (and remote credentials probed)
    /// before anything is committed; on any failure the state is unchanged.
    pub async fn set_context(&self, kind: ContextKind, config: Option<&str>) -> Result<String> {
        let config = config.map(str::trim).filter(|c| !c.is_empty());
        let mut state = self.state.lock().await;

        match (kind, config) {
            (ContextKind::Remote, Some(spec)) => {
                let creds = parse_remote_spec(spec)?;
                creds.ensure_complete()?;
                info!(target = %creds.target(), "Probing remote shell credentials");
                let probe = ssh::run_remote_command(&creds, &self.remote_settings, PROBE_COMMAND)
                    .await
                    .inspect_err(|e| warn!(target = %creds.target(), error = %e, "Remote probe failed"))?;
                if !probe.success() {
                    return Err(GateError::Connection(format!(
                        "probe command exited with status {}: {}",
                        probe.status,
                        probe.combined()
                    )));
                }
                let description = if creds.default_path.is_empty() {
                    creds.target()
                } else {
                    format!("{} {}", creds.target(), creds.default_path)
                };
                state.remote = creds;
                state.kind = ContextKind::Remote;
                Ok(format!(
                    "Context switched to: ssh ({})\nRemote shell connection established.",
                    description
                ))
            }
            (ContextKind::HostedRepo, Some(spec)) => {
                let coords = parse_hosted_repo(spec)?;
                let description = format!("{}/{}", coords.owner, coords.repo);
                state.hosted_repo = coords;
                state.kind = ContextKind::HostedRepo;
                Ok(format!("Context switched to: github ({})", description))
            }
            (kind, _) => {
                state.kind = kind;
                Ok(format!("Context switched to: {}", kind))
            }
        }
    }

    pub async fn config_report(&self) -> String {
        self.state.lock().await.masked_report()
    }
}
