//! Core types for rclone-worker

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operation requested by the host scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    /// Copy a remote file or folder to local storage
    Download,
    /// Copy local content to a remote (not implemented)
    Upload,
    /// Move content between locations (not implemented)
    Move,
    /// Delete remote content (not implemented)
    Delete,
}

impl OperationKind {
    /// Stable input-key spelling of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Download => "DOWNLOAD",
            OperationKind::Upload => "UPLOAD",
            OperationKind::Move => "MOVE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOWNLOAD" => Ok(OperationKind::Download),
            "UPLOAD" => Ok(OperationKind::Upload),
            "MOVE" => Ok(OperationKind::Move),
            "DELETE" => Ok(OperationKind::Delete),
            other => Err(format!("unknown operation kind: {other:?}")),
        }
    }
}

/// A configured rclone remote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Remote name as configured in rclone (without the trailing colon)
    pub id: String,
    /// Backend type of the remote (e.g. "drive", "s3")
    pub kind: String,
}

impl RemoteItem {
    /// Create a remote descriptor
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// A file or folder on a remote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    /// Remote name the item lives on
    pub remote: String,
    /// Path of the item relative to the remote root
    pub path: String,
    /// Display name (last path component)
    pub name: String,
    /// Size in bytes (0 for folders or unknown)
    #[serde(default)]
    pub size: u64,
    /// Whether the item is a folder
    #[serde(default)]
    pub is_dir: bool,
    /// MIME type reported by the remote
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Modification time (unix millis)
    #[serde(default)]
    pub modified: Option<i64>,
}

/// Per-operation payload of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Download `source` into the local directory `target`
    Download {
        /// Remote item to fetch
        source: FileItem,
        /// Local destination directory
        target: PathBuf,
    },
}

impl Operation {
    /// Kind tag of this operation
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Download { .. } => OperationKind::Download,
        }
    }
}

/// Immutable description of one run, built once from host input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    /// Remote the operation runs against
    pub remote: RemoteItem,
    /// What to do
    pub operation: Operation,
    /// Suppress every terminal notification
    pub silent: bool,
}

impl RunRequest {
    /// Title used for every notification of this run
    pub fn title(&self) -> String {
        match &self.operation {
            Operation::Download { source, .. } => format!("Downloading {}", source.name),
        }
    }
}

/// Reason a run ended, one active value per run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The run succeeded
    #[default]
    None,
    /// Only a metered connection was available
    NoUnmetered,
    /// No network connection was available
    NoConnection,
    /// The engine failed or could not be launched
    RcloneError,
    /// Connectivity changed while the run was active
    ConnectivityChanged,
    /// The host cancelled the run
    Cancelled,
    /// No valid task was supplied
    NoTask,
}

impl FailureReason {
    /// Whether this reason represents a failed run
    pub fn is_failure(&self) -> bool {
        !matches!(self, FailureReason::None)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            FailureReason::None => 0,
            FailureReason::NoUnmetered => 1,
            FailureReason::NoConnection => 2,
            FailureReason::RcloneError => 3,
            FailureReason::ConnectivityChanged => 4,
            FailureReason::Cancelled => 5,
            FailureReason::NoTask => 6,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => FailureReason::NoUnmetered,
            2 => FailureReason::NoConnection,
            3 => FailureReason::RcloneError,
            4 => FailureReason::ConnectivityChanged,
            5 => FailureReason::Cancelled,
            6 => FailureReason::NoTask,
            _ => FailureReason::None,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureReason::None => "none",
            FailureReason::NoUnmetered => "no_unmetered",
            FailureReason::NoConnection => "no_connection",
            FailureReason::RcloneError => "rclone_error",
            FailureReason::ConnectivityChanged => "connectivity_changed",
            FailureReason::Cancelled => "cancelled",
            FailureReason::NoTask => "no_task",
        };
        f.write_str(s)
    }
}

/// Result handed back to the host scheduler
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkResult {
    /// The operation completed
    Success,
    /// The operation failed, was cancelled, or never started
    Failure,
}

/// Lifecycle phase of a worker run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Constructed, `do_work` not yet called
    NotStarted,
    /// Decoding input, launching the engine, checking preconditions
    Preparing,
    /// Consuming the diagnostic stream
    Running,
    /// Composing the terminal notification
    Finalizing,
    /// Run is over
    Terminated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_parses_input_spelling() {
        assert_eq!(
            "DOWNLOAD".parse::<OperationKind>(),
            Ok(OperationKind::Download)
        );
        assert_eq!("DELETE".parse::<OperationKind>(), Ok(OperationKind::Delete));
        assert!("download".parse::<OperationKind>().is_err());
        assert!("".parse::<OperationKind>().is_err());
    }

    #[test]
    fn failure_reason_u8_mapping_is_lossless() {
        for reason in [
            FailureReason::None,
            FailureReason::NoUnmetered,
            FailureReason::NoConnection,
            FailureReason::RcloneError,
            FailureReason::ConnectivityChanged,
            FailureReason::Cancelled,
            FailureReason::NoTask,
        ] {
            assert_eq!(FailureReason::from_u8(reason.to_u8()), reason);
        }
    }

    #[test]
    fn download_title_uses_item_name() {
        let request = RunRequest {
            remote: RemoteItem::new("gdrive", "drive"),
            operation: Operation::Download {
                source: FileItem {
                    remote: "gdrive".into(),
                    path: "photos/cat.jpg".into(),
                    name: "cat.jpg".into(),
                    size: 10,
                    is_dir: false,
                    mime_type: None,
                    modified: None,
                },
                target: PathBuf::from("/sdcard/Download"),
            },
            silent: false,
        };
        assert_eq!(request.title(), "Downloading cat.jpg");
        assert_eq!(request.operation.kind(), OperationKind::Download);
    }
}
