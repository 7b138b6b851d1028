//! Ownership of the engine child process

use super::command::EngineCommand;
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStderr, Command};

/// Owns one engine process for the duration of a run
///
/// A supervisor may also be "not started" (the run never launched the
/// engine); every operation is then a no-op.
#[derive(Debug)]
pub struct SubprocessSupervisor {
    child: Option<Child>,
    exit_status: Option<ExitStatus>,
    terminated: bool,
}

impl SubprocessSupervisor {
    /// Supervisor with no process
    pub fn not_started() -> Self {
        Self {
            child: None,
            exit_status: None,
            terminated: false,
        }
    }

    /// Launch `command`
    ///
    /// stdin is closed, stdout is discarded and stderr is piped: the engine
    /// writes its status stream there. The child is killed if the supervisor
    /// is dropped while it still runs.
    pub fn start(command: &EngineCommand) -> Result<Self> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::ProcessLaunch {
                program: command.program.clone(),
                source,
            })?;

        tracing::info!(pid = ?child.id(), command = %command.display(), "engine started");

        Ok(Self {
            child: Some(child),
            exit_status: None,
            terminated: false,
        })
    }

    /// Take the engine's diagnostic (stderr) stream
    ///
    /// Returns `None` when not started or when the stream was already taken.
    pub fn take_diagnostic_stream(&mut self) -> Option<ChildStderr> {
        self.child.as_mut().and_then(|c| c.stderr.take())
    }

    /// Kill the process immediately
    ///
    /// Safe to call repeatedly, on an exited process, or when nothing was
    /// started. Killing closes the diagnostic stream, so a reader sees a
    /// normal end of stream.
    pub fn terminate(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        if self.terminated || self.exit_status.is_some() {
            return;
        }
        match child.try_wait() {
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "could not poll engine before kill"),
        }
        match child.start_kill() {
            Ok(()) => tracing::info!(pid = ?child.id(), "engine terminated"),
            Err(e) => tracing::debug!(error = %e, "engine kill failed, likely already exited"),
        }
        self.terminated = true;
    }

    /// Wait for the process to exit
    ///
    /// Cancellation safe. Returns `None` when nothing was started or the
    /// wait itself failed; the failure is logged, not retried, and the
    /// caller proceeds as if the process state were unknown.
    pub async fn wait_for_exit(&mut self) -> Option<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Some(status);
        }
        let child = self.child.as_mut()?;
        match child.wait().await {
            Ok(status) => {
                tracing::debug!(%status, "engine exited");
                self.exit_status = Some(status);
                Some(status)
            }
            Err(e) => {
                tracing::error!(error = %e, "error waiting for engine process");
                None
            }
        }
    }

    /// Whether `terminate` actually signalled the process
    pub fn was_terminated(&self) -> bool {
        self.terminated
    }
}
