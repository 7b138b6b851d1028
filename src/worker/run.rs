//! The state of one accepted run and its protocol

use super::Shared;
use crate::config::WorkerConfig;
use crate::error::Error;
use crate::line_log::LineLog;
use crate::network::{
    ConnectivityChange, ConnectivityProbe, ConnectivitySubscription, GateDecision,
    PreconditionGate,
};
use crate::notify::{NotificationSink, messages, sync_log_error, sync_log_info};
use crate::process::{CommandFactory, RcloneCommandFactory, SubprocessSupervisor};
use crate::status::{LineProtocolParser, ParsedLine, Severity, StatusAggregator, parse_line};
use crate::types::{FailureReason, RunRequest, WorkResult, WorkerPhase};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// What woke the stream loop
enum Step {
    Cancelled,
    Connectivity(ConnectivityChange),
    Line(std::io::Result<Option<String>>),
}

/// What woke the wait for engine exit
enum Wait {
    Cancelled,
    Connectivity(ConnectivityChange),
    Exited(Option<ExitStatus>),
}

/// One accepted run: request, engine, totals and notification state
///
/// Created once input has been decoded; owned by the worker's task.
pub struct Run {
    shared: Arc<Shared>,
    request: RunRequest,
    title: String,
    notifications: Arc<dyn NotificationSink>,
    aggregator: StatusAggregator,
    supervisor: SubprocessSupervisor,
    subscription: ConnectivitySubscription,
    line_log: LineLog,
    ongoing_id: i32,
    stopping: bool,
}

impl Run {
    pub(crate) fn new(
        shared: Arc<Shared>,
        request: RunRequest,
        notifications: Arc<dyn NotificationSink>,
        subscription: ConnectivitySubscription,
        line_log: LineLog,
    ) -> Self {
        let title = request.title();
        Self {
            shared,
            request,
            title,
            notifications,
            aggregator: StatusAggregator::new(),
            supervisor: SubprocessSupervisor::not_started(),
            subscription,
            line_log,
            ongoing_id: rand::random::<i32>(),
            stopping: false,
        }
    }

    /// Post the initial progress notification and the cancel id
    pub(crate) fn announce(&self) {
        self.notifications.update_progress(
            &self.title,
            messages::STARTING_SYNC,
            &[],
            0,
            self.ongoing_id,
        );
        self.notifications.set_cancel_id(&self.shared.run_id);
    }

    pub(crate) async fn execute(
        &mut self,
        config: &WorkerConfig,
        gate: &PreconditionGate,
        probe: &dyn ConnectivityProbe,
        commands: Option<Arc<dyn CommandFactory>>,
    ) -> WorkResult {
        if self.shared.cancel.is_cancelled() {
            sync_log_info(&self.title, messages::OPERATION_CANCELLED);
            self.shared.classifier.record(FailureReason::Cancelled);
            return self.abort();
        }

        if config.gate.check_before_launch && !self.gate_passes(gate, probe) {
            return self.abort();
        }

        if let Err(e) = self.launch(config, commands) {
            tracing::error!(
                run = %self.shared.run_id,
                code = e.error_code(),
                error = %e,
                "engine launch failed"
            );
            self.shared.classifier.record(e.failure_reason());
            return self.abort();
        }

        if !config.gate.check_before_launch && !self.gate_passes(gate, probe) {
            // the engine's output is discarded unread
            return self.abort();
        }

        self.shared.set_phase(WorkerPhase::Running);
        match self.supervisor.take_diagnostic_stream() {
            Some(stream) => self.follow(stream, config.fail_on_engine_exit_code).await,
            None => {
                tracing::error!(run = %self.shared.run_id, "no engine process to read from");
                self.follow(tokio::io::empty(), config.fail_on_engine_exit_code).await
            }
        }
    }

    /// Consume `stream` until it ends or the run stops, then wait for the
    /// engine and finalize
    pub(crate) async fn follow<R: AsyncRead + Unpin>(
        &mut self,
        stream: R,
        fail_on_exit_code: bool,
    ) -> WorkResult {
        self.consume_stream(stream).await;
        let status = self.wait_for_engine().await;
        self.classify_exit(status, fail_on_exit_code);

        self.notifications.cancel_progress(self.ongoing_id);
        self.subscription.unregister();
        self.post_sync();
        self.line_log.flush().await;
        self.result()
    }

    /// End the run before the engine's output is consumed
    fn abort(&mut self) -> WorkResult {
        self.notifications.cancel_progress(self.ongoing_id);
        self.finish_work();
        self.result()
    }

    fn launch(
        &mut self,
        config: &WorkerConfig,
        commands: Option<Arc<dyn CommandFactory>>,
    ) -> crate::Result<()> {
        let command = match commands {
            Some(factory) => factory.build(&self.request)?,
            None => RcloneCommandFactory::from_config(&config.rclone)?.build(&self.request)?,
        };
        self.supervisor = SubprocessSupervisor::start(&command)?;
        Ok(())
    }

    fn gate_passes(&self, gate: &PreconditionGate, probe: &dyn ConnectivityProbe) -> bool {
        match gate.check(probe) {
            GateDecision::Pass => true,
            GateDecision::Fail(reason) => {
                tracing::warn!(run = %self.shared.run_id, %reason, "preconditions are not met");
                self.shared.classifier.record(reason);
                false
            }
        }
    }

    /// Read status lines until end of stream, a read fault, or a stop
    ///
    /// Stopping leaves the loop at once: the terminal notification is
    /// already posted, and descendants of the engine may keep the stream
    /// open after the engine itself is killed.
    async fn consume_stream<R: AsyncRead + Unpin>(&mut self, stream: R) {
        let mut parser = LineProtocolParser::new(stream);

        loop {
            let step = tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => Step::Cancelled,
                change = self.subscription.changed() => Step::Connectivity(change),
                line = parser.next_line() => Step::Line(line),
            };
            match step {
                Step::Cancelled => {
                    self.on_stopped();
                    break;
                }
                Step::Connectivity(change) => {
                    self.on_connectivity_changed(change);
                    break;
                }
                Step::Line(Ok(Some(line))) => self.handle_line(&line, &mut parser).await,
                Step::Line(Ok(None)) => break,
                Step::Line(Err(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                    tracing::error!(run = %self.shared.run_id, error = %e, "I/O interrupted, stream closed");
                    break;
                }
                Step::Line(Err(e)) => {
                    tracing::error!(run = %self.shared.run_id, error = %e, "error reading engine output");
                    break;
                }
            }
        }
        tracing::debug!(
            run = %self.shared.run_id,
            lines = parser.lines_read(),
            malformed = parser.malformed_count(),
            "diagnostic stream closed"
        );
    }

    async fn handle_line<R: AsyncRead + Unpin>(
        &mut self,
        line: &str,
        parser: &mut LineProtocolParser<R>,
    ) {
        match parse_line(line) {
            ParsedLine::Event(event) => {
                if event.level == Severity::Error {
                    self.line_log.append(line).await;
                }
                self.aggregator.ingest(&event);
                let snapshot = self.aggregator.snapshot();
                self.notifications.update_progress(
                    &self.title,
                    &snapshot.notification_body(),
                    &snapshot.notification_detail(),
                    snapshot.percent,
                    self.ongoing_id,
                );
            }
            ParsedLine::Malformed(reason) => parser.record_malformed(line, &reason),
            ParsedLine::Ignored(_) | ParsedLine::Blank => {}
        }
    }

    async fn wait_for_engine(&mut self) -> Option<ExitStatus> {
        loop {
            let wait = tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled(), if !self.stopping => Wait::Cancelled,
                change = self.subscription.changed(), if !self.stopping => Wait::Connectivity(change),
                status = self.supervisor.wait_for_exit() => Wait::Exited(status),
            };
            match wait {
                Wait::Cancelled => self.on_stopped(),
                Wait::Connectivity(change) => self.on_connectivity_changed(change),
                Wait::Exited(status) => return status,
            }
        }
    }

    fn classify_exit(&self, status: Option<ExitStatus>, fail_on_exit_code: bool) {
        let Some(status) = status else {
            return;
        };
        if status.success() || self.supervisor.was_terminated() || !fail_on_exit_code {
            return;
        }
        let error = Error::ExternalTool(format!("rclone exited with {status}"));
        if self.shared.classifier.record_if_unset(error.failure_reason()) {
            tracing::warn!(
                run = %self.shared.run_id,
                code = error.error_code(),
                error = %error,
                "engine exited with failure"
            );
        }
    }

    fn on_stopped(&mut self) {
        let snapshot = self.snapshot();
        let mut progress = snapshot.notification_body();
        for line in snapshot.notification_detail() {
            progress.push('\n');
            progress.push_str(&line);
        }
        sync_log_info(&self.title, messages::OPERATION_CANCELLED);
        sync_log_info(&self.title, &progress);
        self.stop_with(FailureReason::Cancelled);
    }

    fn on_connectivity_changed(&mut self, change: ConnectivityChange) {
        tracing::warn!(run = %self.shared.run_id, connection = ?change.connection, "connectivity changed during run");
        self.stop_with(FailureReason::ConnectivityChanged);
    }

    fn stop_with(&mut self, reason: FailureReason) {
        self.shared.classifier.record(reason);
        self.finish_work();
    }

    /// Early termination: kill the engine, stop listening, finalize
    ///
    /// Every call after the first leaves notifications untouched.
    pub fn finish_work(&mut self) {
        self.stopping = true;
        self.supervisor.terminate();
        self.subscription.unregister();
        self.post_sync();
    }

    /// Post the terminal notification, at most once per run
    fn post_sync(&mut self) {
        self.shared.set_phase(WorkerPhase::Finalizing);
        if self.request.silent {
            return;
        }
        if !self.shared.outcome.try_claim() {
            return;
        }

        let id = terminal_notification_id();
        let snapshot = self.aggregator.snapshot();
        match self.shared.classifier.current() {
            FailureReason::None => {
                let message = messages::success_message(&self.title, &snapshot);
                self.notifications.show_success(&self.title, &message, id);
                sync_log_info(
                    &format!("{} succeeded", self.title),
                    &format!("{message}\n{}", messages::speed_summary(&snapshot)),
                );
            }
            FailureReason::Cancelled => {
                sync_log_info(&self.title, messages::OPERATION_CANCELLED);
                self.notifications.show_cancelled(
                    &self.title,
                    messages::OPERATION_CANCELLED,
                    id,
                    0,
                );
            }
            reason => {
                let text = messages::with_error_dump(
                    messages::failure_message(&self.title, reason),
                    &snapshot,
                );
                sync_log_error(messages::OPERATION_FAILED, &format!("{}: {text}", self.title));
                self.notifications.show_failed(&self.title, &text, id, 0);
            }
        }
    }

    fn result(&self) -> WorkResult {
        if self.shared.classifier.current().is_failure() {
            WorkResult::Failure
        } else {
            WorkResult::Success
        }
    }

    /// Snapshot of the totals so far
    pub fn snapshot(&self) -> crate::status::ProgressSnapshot {
        self.aggregator.snapshot()
    }
}

fn terminal_notification_id() -> i32 {
    chrono::Utc::now().timestamp_millis() as i32
}
