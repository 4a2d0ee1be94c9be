//! Spinner output while waiting on operations
//!
//! Wraps the core poller's progress events in an indicatif spinner on
//! stderr. Nothing is drawn when stderr is not a terminal.

use cloudctl_core::operation::OperationState;
use cloudctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner with the standard style
pub fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb.set_message(message);
    pb
}

/// Progress callback that updates `pb`
pub fn progress_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |event: ProgressEvent| {
        pb.set_message(describe(&event));
    })
}

/// Spinner text for an event
fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started { operation_id } => {
            format!("Waiting for operation {}", operation_id)
        }
        ProgressEvent::Polling {
            operation_id,
            state,
            ..
        } => format!("Operation {}: {}", operation_id, format_state(state)),
        ProgressEvent::Retrying {
            operation_id,
            attempt,
            ..
        } => format!(
            "Operation {}: status unavailable, retry {}",
            operation_id, attempt
        ),
        ProgressEvent::Completed { operation_id } => format!(
            "Operation {}: {}",
            operation_id,
            format_state(&OperationState::Succeeded)
        ),
        ProgressEvent::Failed { operation_id, error } => {
            format!("Operation {} failed: {}", operation_id, error)
        }
    }
}

/// Format operation state for display with status icons
fn format_state(state: &OperationState) -> String {
    match state {
        OperationState::Succeeded => format!("\u{2713} {}", state), // checkmark
        OperationState::Failed => format!("\u{2717} {}", state),    // x mark
        OperationState::InProgress => format!("\u{21bb} {}", state), // arrow circle
        OperationState::Unknown => state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_state_icons() {
        assert_eq!(format_state(&OperationState::Succeeded), "\u{2713} SUCCEEDED");
        assert_eq!(format_state(&OperationState::Failed), "\u{2717} FAILED");
        assert!(format_state(&OperationState::InProgress).ends_with("IN_PROGRESS"));
        assert_eq!(format_state(&OperationState::Unknown), "UNKNOWN");
    }

    #[test]
    fn test_describe_polling() {
        let message = describe(&ProgressEvent::Polling {
            operation_id: "op-1".to_string(),
            state: OperationState::InProgress,
            elapsed: Duration::from_secs(3),
        });
        assert!(message.starts_with("Operation op-1:"));
        assert!(message.contains("IN_PROGRESS"));
    }

    #[test]
    fn test_describe_failure_includes_cause() {
        let message = describe(&ProgressEvent::Failed {
            operation_id: "op-2".to_string(),
            error: "quota exceeded".to_string(),
        });
        assert_eq!(message, "Operation op-2 failed: quota exceeded");
    }
}
