//! Progress events for operation polling
//!
//! The poller emits these so a caller can drive a spinner or log lines
//! without the core knowing anything about presentation.

use std::time::Duration;

use crate::operation::OperationState;

/// Progress events emitted while awaiting an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Polling has started
    Started { operation_id: String },
    /// A status fetch returned a non-terminal state
    Polling {
        operation_id: String,
        state: OperationState,
        elapsed: Duration,
    },
    /// A status fetch failed and will be retried
    Retrying {
        operation_id: String,
        attempt: u32,
        error: String,
    },
    /// The operation succeeded
    Completed { operation_id: String },
    /// The operation reached the failed state
    Failed { operation_id: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to update its spinner; library callers usually pass `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
