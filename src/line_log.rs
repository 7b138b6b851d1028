//! Optional on-disk copy of raw error-level status lines

use crate::config::LoggingConfig;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only log of raw engine lines
///
/// Inert unless logging is enabled and a file is configured. Write failures
/// are logged and disable the log for the rest of the run; they never
/// affect the run itself.
#[derive(Debug)]
pub struct LineLog {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl LineLog {
    /// Log that never writes
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    /// Open the log described by `config`
    pub async fn open(config: &LoggingConfig) -> Self {
        let path = match (config.enabled, &config.log_file) {
            (true, Some(path)) => path.clone(),
            _ => return Self::disabled(),
        };
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => Self {
                path: Some(path),
                file: Some(file),
            },
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "could not open status line log");
                Self::disabled()
            }
        }
    }

    /// Whether lines are being written
    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the log file, when enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line
    pub async fn append(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        if let Err(e) = file.write_all(&buf).await {
            tracing::warn!(path = ?self.path, error = %e, "status line log write failed, disabling");
            self.file = None;
        }
    }

    /// Flush buffered writes
    pub async fn flush(&mut self) {
        if let Some(file) = self.file.as_mut()
            && let Err(e) = file.flush().await
        {
            tracing::warn!(path = ?self.path, error = %e, "status line log flush failed");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_without_file() {
        let log = LineLog::open(&LoggingConfig {
            enabled: true,
            log_file: None,
        })
        .await;
        assert!(!log.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_when_not_enabled() {
        let temp = tempfile::tempdir().unwrap();
        let log = LineLog::open(&LoggingConfig {
            enabled: false,
            log_file: Some(temp.path().join("lines.log")),
        })
        .await;
        assert!(!log.is_enabled());
        assert!(!temp.path().join("lines.log").exists());
    }

    #[tokio::test]
    async fn test_appends_lines() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("lines.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut log = LineLog::open(&LoggingConfig {
            enabled: true,
            log_file: Some(path.clone()),
        })
        .await;
        assert_eq!(log.path(), Some(path.as_path()));
        log.append("{\"level\":\"error\"}").await;
        log.append("second").await;
        log.flush().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "earlier\n{\"level\":\"error\"}\nsecond\n");
    }

    #[tokio::test]
    async fn test_unopenable_path_disables() {
        let log = LineLog::open(&LoggingConfig {
            enabled: true,
            log_file: Some(PathBuf::from("/nonexistent/dir/lines.log")),
        })
        .await;
        assert!(!log.is_enabled());
    }
}
