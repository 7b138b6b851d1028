//! User-facing notification text

use crate::status::ProgressSnapshot;
use crate::types::FailureReason;
use crate::utils::{format_size, format_speed};

/// Title of the progress notification before the engine reports anything
pub const STARTING_SYNC: &str = "Starting sync";

/// Title of failure notifications in the sync log
pub const OPERATION_FAILED: &str = "Operation failed";

/// Fixed cancellation message
pub const OPERATION_CANCELLED: &str = "The operation was cancelled";

/// Body of a successful run
pub fn success_message(title: &str, snapshot: &ProgressSnapshot) -> String {
    let mut message = match snapshot.total_transfers {
        0 => "Nothing needed to be transferred".to_string(),
        1 => format!(
            "{title} finished: {} in 1 file",
            format_size(snapshot.total_bytes)
        ),
        n => format!(
            "{title} finished: {} in {n} files",
            format_size(snapshot.total_bytes)
        ),
    };
    match snapshot.deletions {
        0 => {}
        1 => message.push_str("\nDeleted 1 file"),
        n => message.push_str(&format!("\nDeleted {n} files")),
    }
    message
}

/// Speed statistics appended to the success entry of the sync log
pub fn speed_summary(snapshot: &ProgressSnapshot) -> String {
    format!(
        "Est. Speed: {}\nAvg. Speed: {}",
        format_speed(snapshot.estimated_average_speed),
        format_speed(snapshot.last_item_average_speed)
    )
}

/// Body of a failed run, before the error dump is appended
pub fn failure_message(title: &str, reason: FailureReason) -> String {
    match reason {
        FailureReason::NoTask => "No valid task was supplied".to_string(),
        FailureReason::ConnectivityChanged => {
            format!("{title} was stopped because the network connection changed")
        }
        FailureReason::NoUnmetered => {
            format!("{title} needs an unmetered connection")
        }
        FailureReason::NoConnection => format!("{title} needs a network connection"),
        FailureReason::RcloneError => format!("{title} failed: rclone reported an error"),
        FailureReason::Cancelled => OPERATION_CANCELLED.to_string(),
        FailureReason::None => format!("{title} failed for an unknown reason"),
    }
}

/// Append the accumulated error dump, separated by a blank line
pub fn with_error_dump(message: String, snapshot: &ProgressSnapshot) -> String {
    let dump = snapshot.error_dump();
    if dump.is_empty() {
        message
    } else {
        format!("{message}\n\n{dump}")
    }
}
