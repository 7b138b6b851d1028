//! Custom assertions over recorded notifications

use rclone_worker::{RecordingSink, SinkCall};

/// Terminal notification kinds
#[derive(Debug, PartialEq, Eq)]
pub enum Terminal {
    /// `show_success`
    Success(String),
    /// `show_cancelled`
    Cancelled(String),
    /// `show_failed`
    Failed(String),
}

/// Return the single terminal notification, panicking on zero or several
pub fn single_terminal(sink: &RecordingSink) -> Terminal {
    let calls = sink.terminal_calls();
    assert_eq!(
        calls.len(),
        1,
        "expected exactly one terminal notification, got {calls:?}"
    );
    match calls.into_iter().next() {
        Some(SinkCall::Success { message, .. }) => Terminal::Success(message),
        Some(SinkCall::Cancelled { message, .. }) => Terminal::Cancelled(message),
        Some(SinkCall::Failed { message, .. }) => Terminal::Failed(message),
        other => panic!("not a terminal call: {other:?}"),
    }
}

/// Bodies of every progress update, in order
pub fn progress_bodies(sink: &RecordingSink) -> Vec<String> {
    sink.calls()
        .into_iter()
        .filter_map(|call| match call {
            SinkCall::Progress { body, .. } => Some(body),
            _ => None,
        })
        .collect()
}

/// Assert the ongoing progress notification was dismissed
pub fn assert_progress_dismissed(sink: &RecordingSink) {
    let calls = sink.calls();
    let ongoing = calls.iter().find_map(|call| match call {
        SinkCall::Progress { id, .. } => Some(*id),
        _ => None,
    });
    let Some(ongoing) = ongoing else {
        panic!("no progress notification was posted");
    };
    assert!(
        calls.contains(&SinkCall::CancelProgress(ongoing)),
        "progress notification {ongoing} was never dismissed"
    );
}
