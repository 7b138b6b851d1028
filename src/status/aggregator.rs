//! Running totals of a run, built from forwarded status events

use super::parser::{Severity, StatusEvent};
use crate::utils::{format_size, format_speed, percent_of};

/// Immutable read of accumulated progress
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Bytes transferred
    pub total_bytes: u64,
    /// Bytes the engine expects to transfer, 0 when unknown
    pub expected_bytes: u64,
    /// Completed transfers
    pub total_transfers: u64,
    /// Deleted items
    pub deletions: u64,
    /// Error messages in the order they were reported
    pub errors: Vec<String>,
    /// Mean of the engine's overall speed samples, bytes/s
    pub estimated_average_speed: f64,
    /// Average speed of the most recent item, bytes/s
    pub last_item_average_speed: f64,
    /// Events ingested
    pub entries: u64,
    /// Error-level events ingested
    pub error_entries: u64,
    /// Warning-level events ingested
    pub warning_entries: u64,
    /// Overall completion, 0..=100
    pub percent: u8,
    /// Item most recently reported on
    pub current_item: Option<String>,
    /// Items the engine reported as in flight
    pub transferring: Vec<String>,
}

impl ProgressSnapshot {
    /// Newline-joined error messages, insertion order
    pub fn error_dump(&self) -> String {
        self.errors.join("\n")
    }

    /// One-line body for the live progress notification
    pub fn notification_body(&self) -> String {
        let mut body = if self.expected_bytes > 0 {
            format!(
                "{} of {}",
                format_size(self.total_bytes),
                format_size(self.expected_bytes)
            )
        } else {
            format!("{} transferred", format_size(self.total_bytes))
        };
        if self.estimated_average_speed > 0.0 {
            body.push_str(&format!(", {}", format_speed(self.estimated_average_speed)));
        }
        body
    }

    /// Expanded lines for the live progress notification
    pub fn notification_detail(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.transferring.clone();
        if lines.is_empty()
            && let Some(item) = &self.current_item
        {
            lines.push(item.clone());
        }
        if self.deletions > 0 {
            lines.push(format!("{} deleted", self.deletions));
        }
        match self.errors.len() {
            0 => {}
            1 => lines.push("1 error".to_string()),
            n => lines.push(format!("{n} errors")),
        }
        lines
    }
}

/// Folds status events into running totals
///
/// Single writer: the stream-reading path of the worker. Readers take a
/// [`ProgressSnapshot`], so nothing here needs a lock. Ingested events are
/// never rolled back.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    entries: u64,
    error_entries: u64,
    warning_entries: u64,
    summed_bytes: u64,
    counted_transfers: u64,
    counted_deletions: u64,
    engine_bytes: u64,
    engine_total_bytes: u64,
    engine_transfers: u64,
    engine_deletes: u64,
    errors: Vec<String>,
    speed_sample_sum: f64,
    speed_sample_count: u64,
    last_item_speed: f64,
    current_item: Option<String>,
    transferring: Vec<String>,
}

impl StatusAggregator {
    /// Empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the totals
    ///
    /// Only error and warning events are applied; returns false for any
    /// other severity.
    pub fn ingest(&mut self, event: &StatusEvent) -> bool {
        match event.level {
            Severity::Error => self.error_entries += 1,
            Severity::Warning => self.warning_entries += 1,
            Severity::Info | Severity::Other(_) => return false,
        }
        self.entries += 1;

        if let Some(object) = &event.object {
            self.current_item = Some(object.clone());
        }

        if event.is_deletion() {
            self.counted_deletions += 1;
        } else if let Some(bytes) = event.bytes.filter(|b| *b > 0) {
            self.summed_bytes = self.summed_bytes.saturating_add(bytes);
            self.counted_transfers += 1;
        }

        if let Some(speed) = event.speed.filter(|s| s.is_finite() && *s > 0.0) {
            self.last_item_speed = speed;
        }

        match event.level {
            Severity::Error => self.errors.push(error_message(event)),
            Severity::Warning => {
                if event.error.is_some() {
                    self.errors.push(error_message(event));
                }
            }
            _ => {}
        }

        if let Some(stats) = &event.stats {
            self.engine_bytes = self.engine_bytes.max(stats.bytes);
            self.engine_total_bytes = self.engine_total_bytes.max(stats.total_bytes);
            self.engine_transfers = self.engine_transfers.max(stats.transfers);
            self.engine_deletes = self.engine_deletes.max(stats.deletes);
            if let Some(speed) = stats.speed.filter(|s| s.is_finite() && *s > 0.0) {
                self.speed_sample_sum += speed;
                self.speed_sample_count += 1;
            }
            self.transferring = stats
                .transferring
                .iter()
                .map(|t| t.name.clone())
                .collect();
            if let Some(last) = stats.transferring.last() {
                self.current_item = Some(last.name.clone());
                if let Some(avg) = last.speed_avg.filter(|s| s.is_finite() && *s > 0.0) {
                    self.last_item_speed = avg;
                }
            }
        }

        true
    }

    /// Current totals
    pub fn snapshot(&self) -> ProgressSnapshot {
        let total_bytes = self.summed_bytes.max(self.engine_bytes);
        ProgressSnapshot {
            total_bytes,
            expected_bytes: self.engine_total_bytes,
            total_transfers: self.counted_transfers.max(self.engine_transfers),
            deletions: self.counted_deletions.max(self.engine_deletes),
            errors: self.errors.clone(),
            estimated_average_speed: self.estimated_average_speed(),
            last_item_average_speed: self.last_item_speed,
            entries: self.entries,
            error_entries: self.error_entries,
            warning_entries: self.warning_entries,
            percent: percent_of(total_bytes, self.engine_total_bytes),
            current_item: self.current_item.clone(),
            transferring: self.transferring.clone(),
        }
    }

    /// Newline-joined error messages, insertion order
    pub fn error_dump(&self) -> String {
        self.errors.join("\n")
    }

    fn estimated_average_speed(&self) -> f64 {
        if self.speed_sample_count == 0 {
            0.0
        } else {
            self.speed_sample_sum / self.speed_sample_count as f64
        }
    }
}

fn error_message(event: &StatusEvent) -> String {
    let text = event
        .error
        .as_deref()
        .or(event.msg.as_deref())
        .unwrap_or("unknown error");
    match &event.object {
        Some(object) => format!("{object}: {text}"),
        None => text.to_string(),
    }
}
