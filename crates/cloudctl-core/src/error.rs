//! Unified error handling for cloudctl-core
//!
//! Every failure keeps its classification and its underlying cause so the
//! caller can render an accurate message.
//!
//! # Example
//!
//! ```rust
//! use cloudctl_core::CoreError;
//! use std::time::Duration;
//!
//! fn handle_error(err: &CoreError) {
//!     if err.is_timeout() {
//!         println!("Still running server-side, check again later");
//!     } else if err.is_retryable() {
//!         println!("Temporary error, can retry");
//!     }
//! }
//!
//! let err = CoreError::Timeout {
//!     operation_id: "op-1".to_string(),
//!     waited: Duration::from_secs(600),
//! };
//! assert!(err.is_timeout());
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::operation::FailureCause;
use crate::reconcile::Mutation;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// HTTP failure, non-success status, or undecodable response
    #[error("API error: {0}")]
    Transport(#[from] ApiError),

    /// The server reports the operation itself did not succeed
    #[error("Operation {operation_id} failed: {cause}")]
    OperationFailed {
        operation_id: String,
        cause: FailureCause,
    },

    /// The wait ceiling elapsed; the operation may still finish server-side
    #[error("Operation {operation_id} did not finish within {waited:?}")]
    Timeout {
        operation_id: String,
        waited: Duration,
    },

    /// The caller stopped waiting
    #[error("Stopped waiting for operation {operation_id}")]
    Cancelled { operation_id: String },

    /// A succeeded operation's payload did not have the expected shape
    #[error("Could not decode the result of operation {operation_id}: {source}")]
    Decode {
        operation_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The operation has not reached a terminal state
    #[error("Operation {operation_id} has not finished")]
    NotTerminal { operation_id: String },

    /// The desired attachment set names the same disk more than once
    #[error("Disk {disk_id} appears more than once in the desired attachments")]
    InvalidDesired { disk_id: String },

    /// A reconcile pass stopped part way; `applied` already took effect
    #[error(
        "Reconcile stopped at '{failed}' after {} applied mutation(s): {source}",
        .applied.len()
    )]
    PartialReconcile {
        applied: Vec<Mutation>,
        failed: Mutation,
        #[source]
        source: Box<CoreError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_not_found(),
            CoreError::PartialReconcile { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_timeout(),
            CoreError::Timeout { .. } => true,
            CoreError::PartialReconcile { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the same call could succeed when re-invoked
    ///
    /// A partial reconcile is only retryable after re-reading observed state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_retryable(),
            CoreError::Timeout { .. } => true,
            CoreError::PartialReconcile { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the caller's input was rejected before any remote call
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::InvalidDesired { .. })
    }

    /// Mutations that took effect before the failure
    pub fn applied_mutations(&self) -> &[Mutation] {
        match self {
            CoreError::PartialReconcile { applied, .. } => applied.as_slice(),
            _ => &[],
        }
    }
}
