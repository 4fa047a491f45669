// shellgate-core/src/tools/ssh.rs

//! One-shot SSH command execution.
//!
//! Every call opens a fresh session, runs exactly one command, collects its
//! output and tears the session down again. Nothing is pooled or reused.

use super::CommandOutput;
use crate::config::RemoteSettings;
use crate::context::RemoteCredentials;
use crate::errors::{GateError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as BASE64;
use ssh2::{HashType, Session};
use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 8192;

/// Runs `command` on the remote host described by `creds`.
///
/// Fails with [`GateError::Connection`] before any command is sent when the
/// host cannot be reached, the host key does not match a configured pin, or
/// authentication is rejected. The returned status is the remote exit code.
pub async fn run_remote_command(
    creds: &RemoteCredentials,
    settings: &RemoteSettings,
    command: &str,
) -> Result<CommandOutput> {
    let creds = creds.clone();
    let settings = settings.clone();
    let command = command.to_string();
    tokio::task::spawn_blocking(move || run_blocking(&creds, &settings, &command))
        .await
        .map_err(|e| GateError::Connection(format!("SSH task failed: {}", e)))?
}

fn run_blocking(
    creds: &RemoteCredentials,
    settings: &RemoteSettings,
    command: &str,
) -> Result<CommandOutput> {
    let session = connect_session(creds, settings)?;
    debug!(target = %creds.target(), command = %command, "Executing remote command");

    let output = exec_on_session(&session, command);
    let _ = session.disconnect(None, "shellgate: command complete", None);
    output
}

fn connect_session(creds: &RemoteCredentials, settings: &RemoteSettings) -> Result<Session> {
    let timeout = settings.connect_timeout();
    let addrs = (creds.host.as_str(), creds.port)
        .to_socket_addrs()
        .map_err(|e| {
            GateError::Connection(format!("Failed to resolve {}: {}", creds.host, e))
        })?;

    let mut last_error = None;
    let mut tcp = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(e) => last_error = Some(e),
        }
    }
    let tcp = tcp.ok_or_else(|| {
        GateError::Connection(format!(
            "Failed to connect to {}:{}: {}",
            creds.host,
            creds.port,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no address resolved".to_string())
        ))
    })?;

    let mut session = Session::new()
        .map_err(|e| GateError::Connection(format!("Failed to create SSH session: {}", e)))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .map_err(|e| GateError::Connection(format!("SSH handshake failed: {}", e)))?;

    verify_host_key(&session, creds, settings)?;

    session
        .userauth_password(&creds.username, &creds.password)
        .map_err(|e| GateError::Connection(format!("SSH authentication failed: {}", e)))?;
    if !session.authenticated() {
        return Err(GateError::Connection("SSH authentication failed".to_string()));
    }

    // The timeout only guards the connect phase; commands run to completion.
    session.set_timeout(0);
    info!(target = %creds.target(), "SSH session established");
    Ok(session)
}

fn verify_host_key(
    session: &Session,
    creds: &RemoteCredentials,
    settings: &RemoteSettings,
) -> Result<()> {
    let observed = session.host_key_hash(HashType::Sha256).map(|hash| BASE64.encode(hash));
    match &settings.host_key_fingerprint {
        Some(expected) => {
            let expected = normalize_fingerprint(expected);
            if observed.as_deref() != Some(expected.as_str()) {
                return Err(GateError::Connection(format!(
                    "SSH host key mismatch for {} (expected {}, got {})",
                    creds.host,
                    expected,
                    observed.unwrap_or_else(|| "unknown".to_string())
                )));
            }
            Ok(())
        }
        None => {
            warn!(
                host = %creds.host,
                fingerprint = observed.as_deref().unwrap_or("unknown"),
                "Accepting SSH host key without verification"
            );
            Ok(())
        }
    }
}

fn exec_on_session(session: &Session, command: &str) -> Result<CommandOutput> {
    let channel_error = |e: ssh2::Error| GateError::RemoteCommand {
        status: -1,
        output: format!("SSH channel error: {}", e),
    };

    let mut channel = session.channel_session().map_err(channel_error)?;
    channel.exec(command).map_err(channel_error)?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut stderr_stream = channel.stderr();
    let mut buf = [0u8; READ_CHUNK];

    session.set_blocking(false);
    let read_result = (|| -> std::io::Result<()> {
        loop {
            let mut progressed = read_available(&mut channel, &mut buf, &mut stdout)?;
            progressed |= read_available(&mut stderr_stream, &mut buf, &mut stderr)?;
            if !progressed {
                if channel.eof() {
                    return Ok(());
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    })();
    session.set_blocking(true);
    read_result.map_err(|e| GateError::RemoteCommand {
        status: -1,
        output: format!("Failed to read remote output: {}", e),
    })?;

    channel.wait_close().map_err(channel_error)?;
    let status = channel.exit_status().unwrap_or(-1);
    debug!(status, "Remote command finished");

    Ok(CommandOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
    })
}

/// Reads whatever is ready. Returns whether any bytes arrived.
fn read_available(
    reader: &mut impl Read,
    buf: &mut [u8],
    sink: &mut Vec<u8>,
) -> std::io::Result<bool> {
    match reader.read(buf) {
        Ok(0) => Ok(false),
        Ok(n) => {
            sink.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

/// Strips an OpenSSH `SHA256:` prefix and base64 padding.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    let trimmed = fingerprint.trim();
    trimmed
        .strip_prefix("SHA256:")
        .unwrap_or(trimmed)
        .trim_end_matches('=')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_normalize_fingerprint() {
        assert_eq!(normalize_fingerprint("SHA256:abcd=="), "abcd");
        assert_eq!(normalize_fingerprint("  abcd  "), "abcd");
        assert_eq!(normalize_fingerprint("abcd"), "abcd");
    }

    #[test]
    fn test_read_available_collects_bytes() {
        let mut reader = Cursor::new(b"remote output".to_vec());
        let mut buf = [0u8; 4];
        let mut sink = Vec::new();
        while read_available(&mut reader, &mut buf, &mut sink).unwrap() {}
        assert_eq!(sink, b"remote output");
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let creds = RemoteCredentials {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "nobody".to_string(),
            password: "nothing".to_string(),
            default_path: String::new(),
        };
        let settings = RemoteSettings {
            connect_timeout_secs: 2,
            host_key_fingerprint: None,
        };
        let result = run_remote_command(&creds, &settings, "echo hi").await;
        assert!(
            matches!(result, Err(GateError::Connection(_))),
            "unexpected result: {:?}",
            result
        );
    }
}
