// shellgate-core/src/backend/local.rs

//! Operations against the local filesystem and process table.

use super::{DirEntryInfo, FsBackend, Listing, PathStatus};
use crate::errors::{GateError, Result};
use crate::tools::{CommandOutput, shell};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info};

/// Relative paths resolve against `work_dir`, the tracked working directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    work_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.work_dir.join(candidate)
        }
    }
}

fn io_error(action: &str, path: &str, e: std::io::Error) -> GateError {
    match e.kind() {
        ErrorKind::NotFound => GateError::NotFound(path.to_string()),
        ErrorKind::AlreadyExists => GateError::AlreadyExists(path.to_string()),
        _ => GateError::io(format!("{} {}", action, path), e),
    }
}

/// Listing paths are relative to `dir` as given; `.` contributes nothing.
fn entry_path(dir: &str, name: &str) -> String {
    if dir == "." {
        name.to_string()
    } else {
        Path::new(dir).join(name).display().to_string()
    }
}

fn rfc3339(time: std::io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

#[async_trait]
impl FsBackend for LocalBackend {
    async fn exec(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput> {
        let dir = match cwd {
            Some(cwd) if !cwd.is_empty() => self.resolve(cwd),
            _ => self.work_dir.clone(),
        };
        shell::execute_shell_command(command, &dir).await
    }

    async fn list_dir(&self, dir: &str) -> Result<Listing> {
        let dir = if dir.is_empty() { "." } else { dir };
        let target = self.resolve(dir);
        debug!(dir = %target.display(), "Listing local directory");

        let mut reader = fs::read_dir(&target)
            .await
            .map_err(|e| io_error("Failed to read directory", dir, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_error("Failed to read directory", dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_directory = entry
                .file_type()
                .await
                .map(|ft| ft.is_dir())
                .unwrap_or(false);
            entries.push(DirEntryInfo {
                path: entry_path(dir, &name),
                name,
                is_directory,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Listing::Entries(entries))
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let target = self.resolve(path);
        let content = fs::read_to_string(&target)
            .await
            .map_err(|e| io_error("Failed to read", path, e))?;
        info!("Read {} bytes from {}", content.len(), target.display());
        Ok(content)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    debug!(parent = %parent.display(), error = %e, "Could not create parent directory");
                }
            }
        }
        fs::write(&target, content)
            .await
            .map_err(|e| io_error("Failed to write", path, e))?;
        info!("Wrote {} bytes to {}", content.len(), target.display());
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        fs::rename(self.resolve(old_path), self.resolve(new_path))
            .await
            .map_err(|e| io_error("Failed to rename", old_path, e))
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path);
        let meta = fs::symlink_metadata(&target)
            .await
            .map_err(|e| io_error("Failed to stat", path, e))?;
        let result = if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&target).await
            } else {
                fs::remove_dir(&target).await
            }
        } else {
            fs::remove_file(&target).await
        };
        result.map_err(|e| io_error("Failed to remove", path, e))
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path);
        let result = if recursive {
            fs::create_dir_all(&target).await
        } else {
            fs::create_dir(&target).await
        };
        result.map_err(|e| io_error("Failed to create directory", path, e))
    }

    async fn stat(&self, path: &str) -> Result<PathStatus> {
        match fs::metadata(self.resolve(path)).await {
            Ok(meta) => Ok(PathStatus {
                exists: true,
                is_directory: Some(meta.is_dir()),
                is_file: Some(meta.is_file()),
                size: Some(meta.len()),
                created: rfc3339(meta.created()),
                modified: rfc3339(meta.modified()),
                error: None,
            }),
            Err(e) => Ok(PathStatus::missing(e.to_string())),
        }
    }

    async fn pwd(&self) -> Result<String> {
        Ok(self.work_dir.display().to_string())
    }

    async fn cd(&self, dir: &str) -> Result<String> {
        let canonical = fs::canonicalize(self.resolve(dir))
            .await
            .map_err(|e| io_error("Cannot access", dir, e))?;
        let meta = fs::metadata(&canonical)
            .await
            .map_err(|e| io_error("Cannot access", dir, e))?;
        if !meta.is_dir() {
            return Err(GateError::io(
                format!("Cannot change into {}", dir),
                std::io::Error::other("not a directory"),
            ));
        }
        std::env::set_current_dir(&canonical)
            .map_err(|e| io_error("Failed to change directory to", dir, e))?;
        info!(dir = %canonical.display(), "Changed local working directory");
        Ok(canonical.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn backend_in(dir: &Path) -> LocalBackend {
        LocalBackend::new(dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip_with_shell_characters() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        let content = "echo \"$HOME\" 'quoted' `tick` \\ backslash\nMCPEOF\nno newline";
        backend.write_file("notes.txt", content).await.unwrap();
        assert_eq!(backend.read_file("notes.txt").await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.write_file("a/b/c.txt", "nested").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(),
            "nested"
        );
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.write_file("f.txt", "first version").await.unwrap();
        backend.write_file("f.txt", "second").await.unwrap();
        assert_eq!(backend.read_file("f.txt").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let result = backend_in(dir.path()).read_file("nope.txt").await;
        assert!(matches!(result, Err(GateError::NotFound(p)) if p == "nope.txt"));
    }

    #[tokio::test]
    async fn test_list_dir_reports_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f1.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sd")).unwrap();
        let backend = backend_in(dir.path());

        let Listing::Entries(entries) = backend.list_dir(".").await.unwrap() else {
            panic!("local listing should be structured");
        };
        assert_eq!(
            entries,
            vec![
                DirEntryInfo {
                    name: "f1.txt".to_string(),
                    is_directory: false,
                    path: "f1.txt".to_string(),
                },
                DirEntryInfo {
                    name: "sd".to_string(),
                    is_directory: true,
                    path: "sd".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_dir_keeps_given_prefix() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sd")).unwrap();
        std::fs::write(dir.path().join("sd").join("inner.txt"), "x").unwrap();
        let backend = backend_in(dir.path());

        let Listing::Entries(entries) = backend.list_dir("sd").await.unwrap() else {
            panic!("local listing should be structured");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "sd/inner.txt");
        assert_eq!(entry_path(".", "f1.txt"), "f1.txt");
        assert_eq!(entry_path("./sd", "a"), "./sd/a");
    }

    #[tokio::test]
    async fn test_mkdir_then_stat_reports_directory() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.mkdir("x/y/z", true).await.unwrap();
        let status = backend.stat("x/y/z").await.unwrap();
        assert!(status.exists);
        assert_eq!(status.is_directory, Some(true));
        assert_eq!(status.is_file, Some(false));
        assert!(status.modified.is_some());
    }

    #[tokio::test]
    async fn test_mkdir_non_recursive_needs_parent() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        assert!(matches!(
            backend.mkdir("missing/child", false).await,
            Err(GateError::NotFound(_))
        ));
        backend.mkdir("top", false).await.unwrap();
        assert!(matches!(
            backend.mkdir("top", false).await,
            Err(GateError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_stat_file_and_missing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"12345").unwrap();
        let backend = backend_in(dir.path());

        let status = backend.stat("data.bin").await.unwrap();
        assert_eq!(status.is_file, Some(true));
        assert_eq!(status.size, Some(5));

        let status = backend.stat("absent").await.unwrap();
        assert!(!status.exists);
        assert!(status.error.is_some());
        assert!(status.size.is_none());
    }

    #[tokio::test]
    async fn test_remove_non_empty_dir_requires_recursive() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.write_file("full/inner.txt", "x").await.unwrap();

        let err = backend.remove("full", false).await.unwrap_err();
        assert!(
            err.to_string().to_lowercase().contains("not empty"),
            "unexpected error: {}",
            err
        );
        assert!(dir.path().join("full/inner.txt").exists());

        backend.remove("full", true).await.unwrap();
        assert!(!dir.path().join("full").exists());
    }

    #[tokio::test]
    async fn test_remove_file_and_empty_dir() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.write_file("f.txt", "x").await.unwrap();
        backend.mkdir("empty", true).await.unwrap();
        backend.remove("f.txt", false).await.unwrap();
        backend.remove("empty", false).await.unwrap();
        assert!(!dir.path().join("f.txt").exists());
        assert!(!dir.path().join("empty").exists());
    }

    #[tokio::test]
    async fn test_rename_moves_file() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        backend.write_file("old.txt", "payload").await.unwrap();
        backend.rename("old.txt", "new.txt").await.unwrap();
        assert!(!dir.path().join("old.txt").exists());
        assert_eq!(backend.read_file("new.txt").await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_exec_defaults_to_work_dir() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/inside.txt"), "x").unwrap();

        let output = backend.exec("ls", Some("sub")).await.unwrap();
        assert_eq!(output.stdout.trim(), "inside.txt");

        let output = backend.exec("ls", None).await.unwrap();
        assert_eq!(output.stdout.trim(), "sub");
    }

    #[tokio::test]
    async fn test_pwd_reports_tracked_dir() {
        let backend = LocalBackend::new(PathBuf::from("/some/tracked/dir"));
        assert_eq!(backend.pwd().await.unwrap(), "/some/tracked/dir");
    }

    #[tokio::test]
    async fn test_cd_rejects_missing_and_file_targets() {
        let dir = tempdir().unwrap();
        let backend = backend_in(dir.path());
        std::fs::write(dir.path().join("plain.txt"), "x").unwrap();
        assert!(backend.cd("does-not-exist").await.is_err());
        assert!(backend.cd("plain.txt").await.is_err());
    }
}
