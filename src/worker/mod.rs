//! Single-shot background worker
//!
//! [`EphemeralWorker`] runs exactly one operation per invocation:
//!
//! 1. decode host input into a [`RunRequest`](crate::types::RunRequest) (invalid input ends the run
//!    with `Failure` and no notification)
//! 2. launch the engine and evaluate the network gate
//! 3. stream the engine's diagnostic output into a
//!    [`StatusAggregator`](crate::status::StatusAggregator),
//!    updating the progress notification as events arrive
//! 4. wait for the engine to exit
//! 5. post exactly one terminal notification
//!
//! Host cancellation ([`WorkerHandle::stop`]) and connectivity changes are
//! delivered as messages and observed by the run loop at safe points. Both
//! lead to an early finish, which kills the engine, unregisters from
//! the connectivity feed and finalizes. Finalization is claimed through an
//! [`OutcomeCell`], so later calls are no-ops.

mod run;

use crate::config::WorkerConfig;
use crate::failure::{FailureClassifier, OutcomeCell};
use crate::network::{ConnectivityFeed, ConnectivityProbe, PreconditionGate};
use crate::notify::NotificationSink;
use crate::process::CommandFactory;
use crate::request::InputData;
use crate::types::{FailureReason, WorkResult, WorkerPhase};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;

use run::Run;

/// State visible to both the run and its handles
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) run_id: String,
    pub(crate) cancel: CancellationToken,
    pub(crate) classifier: FailureClassifier,
    pub(crate) outcome: OutcomeCell,
    phase: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Self {
            run_id: format!("{:016x}", rand::random::<u64>()),
            cancel: CancellationToken::new(),
            classifier: FailureClassifier::new(),
            outcome: OutcomeCell::new(),
            phase: AtomicU8::new(phase_to_u8(WorkerPhase::NotStarted)),
        }
    }

    pub(crate) fn set_phase(&self, phase: WorkerPhase) {
        let previous = phase_from_u8(self.phase.swap(phase_to_u8(phase), Ordering::SeqCst));
        if previous != phase {
            tracing::debug!(run = %self.run_id, ?previous, ?phase, "phase change");
        }
    }

    pub(crate) fn phase(&self) -> WorkerPhase {
        phase_from_u8(self.phase.load(Ordering::SeqCst))
    }
}

fn phase_to_u8(phase: WorkerPhase) -> u8 {
    match phase {
        WorkerPhase::NotStarted => 0,
        WorkerPhase::Preparing => 1,
        WorkerPhase::Running => 2,
        WorkerPhase::Finalizing => 3,
        WorkerPhase::Terminated => 4,
    }
}

fn phase_from_u8(value: u8) -> WorkerPhase {
    match value {
        0 => WorkerPhase::NotStarted,
        1 => WorkerPhase::Preparing,
        2 => WorkerPhase::Running,
        3 => WorkerPhase::Finalizing,
        _ => WorkerPhase::Terminated,
    }
}

/// Host-side control of a running worker
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    shared: Arc<Shared>,
}

impl WorkerHandle {
    /// Request cancellation
    ///
    /// The run records `Cancelled`, kills the engine and posts the
    /// cancellation notification. Calling this more than once, or after
    /// the run has ended, changes nothing.
    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> WorkerPhase {
        self.shared.phase()
    }

    /// Failure reason recorded so far
    pub fn failure_reason(&self) -> FailureReason {
        self.shared.classifier.current()
    }

    /// Identifier handed to the sink as the cancel id
    pub fn run_id(&self) -> &str {
        &self.shared.run_id
    }
}

/// Background execution unit for one engine operation
pub struct EphemeralWorker {
    config: WorkerConfig,
    input: InputData,
    notifications: Arc<dyn NotificationSink>,
    probe: Arc<dyn ConnectivityProbe>,
    connectivity: Option<ConnectivityFeed>,
    commands: Option<Arc<dyn CommandFactory>>,
    shared: Arc<Shared>,
}

impl EphemeralWorker {
    /// Create a worker for one invocation
    ///
    /// Without [`with_command_factory`](Self::with_command_factory) the
    /// engine command is built by [`crate::RcloneCommandFactory`] from
    /// `config.rclone` when the run starts.
    pub fn new(
        config: WorkerConfig,
        input: InputData,
        notifications: Arc<dyn NotificationSink>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            config,
            input,
            notifications,
            probe,
            connectivity: None,
            commands: None,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Listen for connectivity changes on `feed` while running
    pub fn with_connectivity_feed(mut self, feed: ConnectivityFeed) -> Self {
        self.connectivity = Some(feed);
        self
    }

    /// Build engine commands with `factory`
    pub fn with_command_factory(mut self, factory: Arc<dyn CommandFactory>) -> Self {
        self.commands = Some(factory);
        self
    }

    /// Handle for cancelling and observing the run
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the operation to completion
    pub async fn do_work(self) -> WorkResult {
        let shared = Arc::clone(&self.shared);
        shared.set_phase(WorkerPhase::Preparing);

        let request = match crate::types::RunRequest::from_input(&self.input) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(
                    run = %shared.run_id,
                    code = e.error_code(),
                    error = %e,
                    "no valid task, not starting"
                );
                shared.classifier.record(e.failure_reason());
                shared.set_phase(WorkerPhase::Terminated);
                return WorkResult::Failure;
            }
        };

        tracing::info!(
            run = %shared.run_id,
            kind = %request.operation.kind(),
            remote = %request.remote.id,
            "starting run"
        );

        let gate = PreconditionGate::new(&self.config.gate);
        let subscription = match &self.connectivity {
            Some(feed) => feed.subscribe(),
            None => crate::network::ConnectivitySubscription::detached(),
        };
        let line_log = crate::line_log::LineLog::open(&self.config.logging).await;

        let mut run = Run::new(
            Arc::clone(&shared),
            request,
            Arc::clone(&self.notifications),
            subscription,
            line_log,
        );
        run.announce();

        let result = run
            .execute(
                &self.config,
                &gate,
                self.probe.as_ref(),
                self.commands.clone(),
            )
            .await;

        shared.set_phase(WorkerPhase::Terminated);
        tracing::info!(
            run = %shared.run_id,
            reason = %shared.classifier.current(),
            ?result,
            "run finished"
        );
        result
    }
}
