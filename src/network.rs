//! Network preconditions and connectivity change delivery
//!
//! The host owns the platform connectivity APIs. It exposes the current
//! classification through a [`ConnectivityProbe`] and pushes change
//! notifications into a [`ConnectivityFeed`]; the worker subscribes to the
//! feed for the lifetime of a run.

use crate::config::GateConfig;
use crate::types::FailureReason;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Classification of the current data connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    /// Connected without a data cap (e.g. Wi-Fi)
    Unmetered,
    /// Connected over a metered link (e.g. cellular)
    Metered,
    /// No usable connection
    Disconnected,
    /// The platform could not classify the connection
    NotAvailable,
}

/// Query for the current connection classification
pub trait ConnectivityProbe: Send + Sync {
    /// Classify the connection right now
    fn current(&self) -> Connection;
}

/// Probe that always reports the same classification
#[derive(Clone, Copy, Debug)]
pub struct StaticProbe(pub Connection);

impl ConnectivityProbe for StaticProbe {
    fn current(&self) -> Connection {
        self.0
    }
}

/// Result of evaluating the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// The run may proceed
    Pass,
    /// The run must stop with the given reason
    Fail(FailureReason),
}

/// Evaluates network state against the configured policy
#[derive(Clone, Debug)]
pub struct PreconditionGate {
    require_unmetered: bool,
}

impl PreconditionGate {
    /// Build a gate from configuration
    pub fn new(config: &GateConfig) -> Self {
        Self {
            require_unmetered: config.require_unmetered,
        }
    }

    /// Decide whether a run may proceed on `connection`
    pub fn evaluate(&self, connection: Connection) -> GateDecision {
        match connection {
            Connection::Unmetered => GateDecision::Pass,
            Connection::Metered if self.require_unmetered => {
                GateDecision::Fail(FailureReason::NoUnmetered)
            }
            Connection::Metered => GateDecision::Pass,
            Connection::Disconnected | Connection::NotAvailable => {
                GateDecision::Fail(FailureReason::NoConnection)
            }
        }
    }

    /// Probe the connection and evaluate it
    pub fn check(&self, probe: &dyn ConnectivityProbe) -> GateDecision {
        let connection = probe.current();
        let decision = self.evaluate(connection);
        tracing::debug!(?connection, ?decision, "precondition check");
        decision
    }
}

impl Default for PreconditionGate {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

/// A connectivity change pushed by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityChange {
    /// Classification after the change, when known
    pub connection: Option<Connection>,
}

/// Host-owned broadcast of connectivity changes
///
/// Cloning shares the same channel. Each run registers with
/// [`subscribe`](Self::subscribe) and unregisters by dropping the
/// subscription.
#[derive(Clone, Debug)]
pub struct ConnectivityFeed {
    tx: broadcast::Sender<ConnectivityChange>,
}

impl ConnectivityFeed {
    /// Create a feed buffering up to `capacity` undelivered changes per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announce a change to every registered run; returns how many received it
    pub fn notify(&self, change: ConnectivityChange) -> usize {
        self.tx.send(change).unwrap_or(0)
    }

    /// Register for changes
    pub fn subscribe(&self) -> ConnectivitySubscription {
        ConnectivitySubscription {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Number of currently registered subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ConnectivityFeed {
    fn default() -> Self {
        Self::new(16)
    }
}

/// A run's registration with a [`ConnectivityFeed`]
#[derive(Debug)]
pub struct ConnectivitySubscription {
    rx: Option<broadcast::Receiver<ConnectivityChange>>,
}

impl ConnectivitySubscription {
    /// Subscription that never yields a change
    pub fn detached() -> Self {
        Self { rx: None }
    }

    /// Wait for the next change
    ///
    /// Lagging behind counts as a change. Once unregistered, or when the
    /// feed is gone, this pends forever so it can sit in a `select!`.
    pub async fn changed(&mut self) -> ConnectivityChange {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return std::future::pending().await;
            };
            match rx.recv().await {
                Ok(change) => return change,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "connectivity subscriber lagged");
                    return ConnectivityChange { connection: None };
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                }
            }
        }
    }

    /// Drop the registration; further `changed` calls pend forever
    pub fn unregister(&mut self) {
        self.rx = None;
    }

    /// Whether the subscription is still registered
    pub fn is_registered(&self) -> bool {
        self.rx.is_some()
    }
}
