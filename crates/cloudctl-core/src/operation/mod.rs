//! Long-running operations
//!
//! Every mutating API call returns an [`Operation`] that the server keeps
//! updating until it reaches a terminal state. This module provides the
//! handle that identifies one, the [`StatusFetcher`] seam used to read its
//! current state, the [`Poller`] that drives it to completion, and
//! [`resolve`] to decode the resource it produced.

pub mod poller;
pub mod resolve;

pub use poller::{Clock, Poller, TokioClock};
pub use resolve::{await_and_resolve, resolve};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::api::ApiError;

/// Which operations endpoint tracks an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Disk,
    Instance,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Disk => write!(f, "disk"),
            OperationKind::Instance => write!(f, "instance"),
        }
    }
}

/// A pending server-side mutation
///
/// Created from the response of a mutating call and consumed by exactly one
/// [`Poller::await_operation`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    operation_id: String,
    project_id: String,
    kind: OperationKind,
}

impl OperationHandle {
    pub fn new(
        operation_id: impl Into<String>,
        project_id: impl Into<String>,
        kind: OperationKind,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            project_id: project_id.into(),
            kind,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operation {} (project {})",
            self.kind, self.operation_id, self.project_id
        )
    }
}

/// Server-reported state of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    #[serde(rename = "FAILED")]
    Failed,
    /// Anything the server adds later; treated as still running
    #[serde(other)]
    Unknown,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::InProgress => "IN_PROGRESS",
            OperationState::Succeeded => "SUCCEEDED",
            OperationState::Failed => "FAILED",
            OperationState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Operation record as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: String,
    pub state: OperationState,
    /// Resource payload on success, `{code, message}` on failure
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Domain-level reason an operation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Status view over an [`Operation`]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus<'a> {
    Pending,
    Succeeded(&'a Value),
    Failed(FailureCause),
}

impl Operation {
    pub fn status(&self) -> OperationStatus<'_> {
        match self.state {
            OperationState::Succeeded => OperationStatus::Succeeded(&self.result),
            OperationState::Failed => OperationStatus::Failed(self.failure_cause()),
            OperationState::InProgress | OperationState::Unknown => OperationStatus::Pending,
        }
    }

    /// Decode the failure cause carried in `result`.
    ///
    /// Falls back to the raw payload text when it is not `{code, message}`.
    fn failure_cause(&self) -> FailureCause {
        match serde_json::from_value::<FailureCause>(self.result.clone()) {
            Ok(cause) if !cause.message.is_empty() => cause,
            _ => FailureCause {
                code: None,
                message: match &self.result {
                    Value::Null => "operation failed without a reported cause".to_string(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            },
        }
    }
}

/// Reads the current state of an operation
///
/// Implemented by the API client; the endpoint depends on the
/// [`OperationKind`]. Tests substitute scripted fetchers.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(
        &self,
        project_id: &str,
        operation_id: &str,
        kind: OperationKind,
    ) -> Result<Operation, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(state: &str, result: Value) -> Operation {
        serde_json::from_value(json!({
            "operation_id": "op-1",
            "state": state,
            "result": result,
        }))
        .unwrap()
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!(op("IN_PROGRESS", Value::Null).state, OperationState::InProgress);
        assert_eq!(op("SUCCEEDED", Value::Null).state, OperationState::Succeeded);
        assert_eq!(op("FAILED", Value::Null).state, OperationState::Failed);
        assert_eq!(op("QUEUED", Value::Null).state, OperationState::Unknown);
        assert!(!OperationState::Unknown.is_terminal());
    }

    #[test]
    fn test_status_pending_has_no_payload() {
        let pending = op("IN_PROGRESS", json!({"id": "disk-1"}));
        assert_eq!(pending.status(), OperationStatus::Pending);
    }

    #[test]
    fn test_status_failed_decodes_cause() {
        let failed = op(
            "FAILED",
            json!({"code": "bad_state", "message": "VM must be stopped"}),
        );
        match failed.status() {
            OperationStatus::Failed(cause) => {
                assert_eq!(cause.code.as_deref(), Some("bad_state"));
                assert_eq!(cause.to_string(), "VM must be stopped (bad_state)");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_status_failed_with_unstructured_result() {
        let failed = op("FAILED", json!("quota exceeded"));
        assert_eq!(
            failed.status(),
            OperationStatus::Failed(FailureCause {
                code: None,
                message: "quota exceeded".to_string()
            })
        );

        let empty = op("FAILED", Value::Null);
        match empty.status() {
            OperationStatus::Failed(cause) => assert!(cause.message.contains("without")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_display() {
        let handle = OperationHandle::new("op-9", "proj-1", OperationKind::Instance);
        assert_eq!(
            handle.to_string(),
            "instance operation op-9 (project proj-1)"
        );
    }
}
