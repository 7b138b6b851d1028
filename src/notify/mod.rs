//! Notification boundary
//!
//! The worker never renders anything itself. It calls an injected
//! [`NotificationSink`]; channel setup and rendering belong to the host.
//! [`TracingSink`] is a headless implementation that only logs, and
//! [`RecordingSink`] keeps every call for inspection.

pub mod messages;

use std::sync::Mutex;

/// Host-provided notification surface
pub trait NotificationSink: Send + Sync {
    /// Associate the run with the host's cancel action
    fn set_cancel_id(&self, _run_id: &str) {}

    /// Create or update the ongoing progress notification
    fn update_progress(&self, title: &str, body: &str, detail: &[String], percent: u8, id: i32);

    /// Remove the ongoing progress notification
    fn cancel_progress(&self, id: i32);

    /// Terminal notification for a successful run
    fn show_success(&self, title: &str, message: &str, id: i32);

    /// Terminal notification for a cancelled run
    fn show_cancelled(&self, title: &str, message: &str, id: i32, progress: u8);

    /// Terminal notification for a failed run
    fn show_failed(&self, title: &str, message: &str, id: i32, progress: u8);
}

/// Sink that writes every call to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn update_progress(&self, title: &str, body: &str, detail: &[String], percent: u8, id: i32) {
        tracing::debug!(id, title, body, ?detail, percent, "progress");
    }

    fn cancel_progress(&self, id: i32) {
        tracing::debug!(id, "progress dismissed");
    }

    fn show_success(&self, title: &str, message: &str, id: i32) {
        tracing::info!(id, title, message, "success");
    }

    fn show_cancelled(&self, title: &str, message: &str, id: i32, progress: u8) {
        tracing::info!(id, title, message, progress, "cancelled");
    }

    fn show_failed(&self, title: &str, message: &str, id: i32, progress: u8) {
        tracing::warn!(id, title, message, progress, "failed");
    }
}

/// One call made on a [`RecordingSink`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkCall {
    /// `set_cancel_id`
    CancelId(String),
    /// `update_progress`
    Progress {
        /// Notification title
        title: String,
        /// Short body
        body: String,
        /// Expanded lines
        detail: Vec<String>,
        /// Completion percentage
        percent: u8,
        /// Notification id
        id: i32,
    },
    /// `cancel_progress`
    CancelProgress(i32),
    /// `show_success`
    Success {
        /// Notification title
        title: String,
        /// Body text
        message: String,
        /// Notification id
        id: i32,
    },
    /// `show_cancelled`
    Cancelled {
        /// Notification title
        title: String,
        /// Body text
        message: String,
        /// Notification id
        id: i32,
    },
    /// `show_failed`
    Failed {
        /// Notification title
        title: String,
        /// Body text
        message: String,
        /// Notification id
        id: i32,
    },
}

impl SinkCall {
    /// Whether this call is a terminal notification
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SinkCall::Success { .. } | SinkCall::Cancelled { .. } | SinkCall::Failed { .. }
        )
    }
}

/// Sink that records calls in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<SinkCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Terminal notifications only
    pub fn terminal_calls(&self) -> Vec<SinkCall> {
        self.calls().into_iter().filter(SinkCall::is_terminal).collect()
    }

    fn push(&self, call: SinkCall) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn set_cancel_id(&self, run_id: &str) {
        self.push(SinkCall::CancelId(run_id.to_string()));
    }

    fn update_progress(&self, title: &str, body: &str, detail: &[String], percent: u8, id: i32) {
        self.push(SinkCall::Progress {
            title: title.to_string(),
            body: body.to_string(),
            detail: detail.to_vec(),
            percent,
            id,
        });
    }

    fn cancel_progress(&self, id: i32) {
        self.push(SinkCall::CancelProgress(id));
    }

    fn show_success(&self, title: &str, message: &str, id: i32) {
        self.push(SinkCall::Success {
            title: title.to_string(),
            message: message.to_string(),
            id,
        });
    }

    fn show_cancelled(&self, title: &str, message: &str, id: i32, _progress: u8) {
        self.push(SinkCall::Cancelled {
            title: title.to_string(),
            message: message.to_string(),
            id,
        });
    }

    fn show_failed(&self, title: &str, message: &str, id: i32, _progress: u8) {
        self.push(SinkCall::Failed {
            title: title.to_string(),
            message: message.to_string(),
            id,
        });
    }
}

/// Record an informational entry in the sync log
pub(crate) fn sync_log_info(title: &str, message: &str) {
    tracing::info!(target: "rclone_worker::sync_log", title, "{message}");
}

/// Record an error entry in the sync log
pub(crate) fn sync_log_error(title: &str, message: &str) {
    tracing::error!(target: "rclone_worker::sync_log", title, "{message}");
}
