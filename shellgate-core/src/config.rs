// shellgate-core/src/config.rs

//! Startup configuration: the optional TOML file plus the hosted-repo token
//! pulled from the environment.

use crate::errors::{GateError, Result};
use crate::tools::ssh::normalize_fingerprint;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as BASE64;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "shellgate.toml";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GateConfig {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub hosted_repo: HostedRepoSettings,
}

/// Settings applied to every SSH connection.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Base64 SHA-256 of the expected host key, with or without the OpenSSH
    /// `SHA256:` prefix. Any key is accepted when unset.
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HostedRepoSettings {
    #[serde(default = "default_token_env_var")]
    pub token_env_var: String,
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_token_env_var() -> String {
    DEFAULT_TOKEN_ENV_VAR.to_string()
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            host_key_fingerprint: None,
        }
    }
}

impl Default for HostedRepoSettings {
    fn default() -> Self {
        Self {
            token_env_var: default_token_env_var(),
        }
    }
}

impl RemoteSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl GateConfig {
    pub fn from_toml_str(content: &str) -> Result<GateConfig> {
        let config: GateConfig = match toml::from_str(content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(GateError::config(format!(
                    "Failed to parse configuration TOML: {}",
                    e
                )));
            }
        };

        let timeout = config.remote.connect_timeout_secs;
        if timeout == 0 || timeout > MAX_CONNECT_TIMEOUT_SECS {
            return Err(GateError::config(format!(
                "'remote.connect_timeout_secs' must be between 1 and {}, got {}.",
                MAX_CONNECT_TIMEOUT_SECS, timeout
            )));
        }
        if let Some(fingerprint) = &config.remote.host_key_fingerprint {
            if fingerprint.trim().is_empty() {
                return Err(GateError::config(
                    "'remote.host_key_fingerprint' is empty.",
                ));
            }
            if BASE64.decode(normalize_fingerprint(fingerprint)).is_err() {
                return Err(GateError::config(
                    "'remote.host_key_fingerprint' is not valid base64.",
                ));
            }
        }
        if config.hosted_repo.token_env_var.trim().is_empty() {
            return Err(GateError::config("'hosted_repo.token_env_var' is empty."));
        }

        tracing::debug!("Parsed and validated shellgate configuration.");
        Ok(config)
    }

    /// Loads the configuration from `explicit` when given, otherwise from the
    /// first of `./shellgate.toml` and `<config_dir>/shellgate/config.toml`
    /// that exists. Falls back to defaults when neither does.
    pub fn load(explicit: Option<&Path>) -> Result<GateConfig> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_file(),
        };
        let Some(path) = path else {
            tracing::debug!("No configuration file found, using defaults.");
            return Ok(GateConfig::default());
        };
        tracing::info!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(&path).map_err(|e| {
            GateError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        GateConfig::from_toml_str(&content)
    }

    /// The hosted-repository token, read from the configured environment variable.
    pub fn hosted_repo_token(&self) -> String {
        std::env::var(&self.hosted_repo.token_env_var).unwrap_or_default()
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("shellgate").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_full() {
        let content = r#"
            [remote]
            connect_timeout_secs = 10
            host_key_fingerprint = "c2hlbGxnYXRl"

            [hosted_repo]
            token_env_var = "SHELLGATE_TOKEN"
        "#;
        let config = GateConfig::from_toml_str(content).unwrap();
        assert_eq!(config.remote.connect_timeout_secs, 10);
        assert_eq!(config.remote.connect_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.remote.host_key_fingerprint.as_deref(),
            Some("c2hlbGxnYXRl")
        );
        assert_eq!(config.hosted_repo.token_env_var, "SHELLGATE_TOKEN");
    }

    #[test]
    fn test_config_empty_uses_defaults() {
        let config = GateConfig::from_toml_str("").unwrap();
        assert_eq!(config.remote, RemoteSettings::default());
        assert_eq!(config.remote.connect_timeout_secs, 30);
        assert_eq!(config.hosted_repo.token_env_var, "GITHUB_TOKEN");
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let result = GateConfig::from_toml_str("[remote]\nconnect_timeout_secs = 0\n");
        let error_string = result.err().unwrap().to_string();
        assert!(
            error_string.contains("connect_timeout_secs"),
            "Unexpected error message: {}",
            error_string
        );
    }

    #[test]
    fn test_config_rejects_bad_fingerprint() {
        let result =
            GateConfig::from_toml_str("[remote]\nhost_key_fingerprint = \"not base64!\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_invalid_toml() {
        let result = GateConfig::from_toml_str("[remote\n");
        assert!(matches!(result, Err(GateError::Config(_))));
    }

    #[test]
    fn test_config_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[remote]\nconnect_timeout_secs = 5\n").unwrap();
        let config = GateConfig::load(Some(&path)).unwrap();
        assert_eq!(config.remote.connect_timeout_secs, 5);
    }

    #[test]
    fn test_config_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = GateConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
