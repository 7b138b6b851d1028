//! # rclone-worker
//!
//! Single-shot background worker that runs one rclone operation, follows
//! its JSON log and reports the outcome through host-provided notifications.
//!
//! ## Design Philosophy
//!
//! - **One run per worker** - every invocation decodes its own input, owns
//!   its own engine process and posts exactly one terminal notification
//! - **Host-agnostic** - notifications, connectivity and scheduling are
//!   injected through small traits, nothing here renders UI
//! - **Message-driven cancellation** - stop requests and connectivity
//!   changes are observed by the run loop at safe points
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rclone_worker::{
//!     Connection, EphemeralWorker, FileItem, InputData, StaticProbe, TracingSink, WorkerConfig,
//!     request,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FileItem {
//!         remote: "gdrive".into(),
//!         path: "docs/report.pdf".into(),
//!         name: "report.pdf".into(),
//!         size: 0,
//!         is_dir: false,
//!         mime_type: None,
//!         modified: None,
//!     };
//!     let input = InputData::new()
//!         .with_string(request::EPHEMERAL_TYPE, "DOWNLOAD")
//!         .with_string(request::REMOTE_ID, "gdrive")
//!         .with_string(request::DOWNLOAD_TARGETPATH, "/tmp/downloads")
//!         .with_bytes(request::DOWNLOAD_SOURCE, request::encode_source(&source)?);
//!
//!     let worker = EphemeralWorker::new(
//!         WorkerConfig::default(),
//!         input,
//!         Arc::new(TracingSink),
//!         Arc::new(StaticProbe(Connection::Unmetered)),
//!     );
//!     let result = rclone_worker::run_with_shutdown(worker).await;
//!     println!("{result:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Failure classification and single-shot finalization
pub mod failure;
/// Optional on-disk log of raw error lines
pub mod line_log;
/// Connectivity gate and change feed
pub mod network;
/// Notification sink and message text
pub mod notify;
/// Engine command construction and process supervision
pub mod process;
/// Host input decoding
pub mod request;
/// Status stream parsing and aggregation
pub mod status;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// The background worker
pub mod worker;

// Re-export commonly used types
pub use config::{GateConfig, LoggingConfig, RcloneConfig, WorkerConfig};
pub use error::{Error, Result};
pub use failure::{FailureClassifier, OutcomeCell};
pub use network::{
    Connection, ConnectivityChange, ConnectivityFeed, ConnectivityProbe, GateDecision,
    PreconditionGate, StaticProbe,
};
pub use notify::{NotificationSink, RecordingSink, SinkCall, TracingSink};
pub use process::{CommandFactory, EngineCommand, RcloneCommandFactory};
pub use request::InputData;
pub use status::{ProgressSnapshot, StatusAggregator};
pub use types::{
    FailureReason, FileItem, Operation, OperationKind, RemoteItem, RunRequest, WorkResult,
    WorkerPhase,
};
pub use worker::{EphemeralWorker, WorkerHandle};

/// Run a worker, stopping it when the process receives a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// A signal is handled like a host cancellation: the engine is killed and
/// the cancellation notification is posted.
pub async fn run_with_shutdown(worker: EphemeralWorker) -> WorkResult {
    let handle = worker.handle();
    let run = worker.do_work();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            handle.stop();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal, stopping run");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C), stopping run");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C), stopping run");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal, stopping run");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal, stopping run");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
