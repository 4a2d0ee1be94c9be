//! Test doubles for the operation and reconcile seams
//!
//! Used by this crate's tests and by downstream crates that want to drive the
//! poller or reconciler without a server or wall-clock delay.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::api::ApiError;
use crate::attachment::AttachmentRecord;
use crate::operation::{
    Clock, Operation, OperationHandle, OperationKind, OperationState, StatusFetcher,
};
use crate::reconcile::{AttachmentSubmitter, Mutation};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An in-progress operation record
pub fn pending(operation_id: &str) -> Operation {
    Operation {
        operation_id: operation_id.to_string(),
        state: OperationState::InProgress,
        result: Value::Null,
        metadata: Value::Null,
        started_at: None,
        completed_at: None,
    }
}

/// A succeeded operation record carrying `result`
pub fn succeeded(operation_id: &str, result: Value) -> Operation {
    Operation {
        state: OperationState::Succeeded,
        result,
        ..pending(operation_id)
    }
}

/// A failed operation record with a `{code, message}` cause
pub fn failed(operation_id: &str, code: &str, message: &str) -> Operation {
    Operation {
        state: OperationState::Failed,
        result: json!({ "code": code, "message": message }),
        ..pending(operation_id)
    }
}

/// A transport error as the API client would report a 5xx
pub fn server_error(message: &str) -> ApiError {
    ApiError::Status {
        status: 503,
        message: message.to_string(),
    }
}

/// Clock that advances only when slept on
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Move the clock forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        *lock(&self.offset) += by;
    }

    /// Total simulated time elapsed
    pub fn elapsed(&self) -> Duration {
        *lock(&self.offset)
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Status fetcher that replays a fixed script of responses
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Operation, ApiError>>>,
    repeat: Option<Operation>,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<Operation, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            cancel_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fetcher that reports the same record forever
    pub fn always(operation: Operation) -> Self {
        Self::new(Vec::new()).then_repeat(operation)
    }

    /// Once the script is exhausted, keep returning `operation`
    pub fn then_repeat(mut self, operation: Operation) -> Self {
        self.repeat = Some(operation);
        self
    }

    /// Cancel `token` when the `n`-th fetch happens
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Number of fetches made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _project_id: &str,
        operation_id: &str,
        _kind: OperationKind,
    ) -> Result<Operation, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, token)) = &self.cancel_after
            && call >= *n
        {
            token.cancel();
        }

        if let Some(next) = lock(&self.script).pop_front() {
            return next;
        }
        match &self.repeat {
            Some(op) => Ok(op.clone()),
            None => Err(ApiError::Status {
                status: 404,
                message: format!("no scripted response for operation {operation_id}"),
            }),
        }
    }
}

/// Status fetcher whose requests never get an answer
#[derive(Default)]
pub struct StalledFetcher {
    calls: AtomicUsize,
}

impl StalledFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetcher for StalledFetcher {
    async fn fetch(
        &self,
        _project_id: &str,
        _operation_id: &str,
        _kind: OperationKind,
    ) -> Result<Operation, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// What the fake API should do with one mutation
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Accept the submission; the operation succeeds
    Succeed,
    /// Accept the submission; the operation ends in FAILED
    Fail(String),
    /// Reject the submission with a transport error
    Reject(String),
}

/// Attachment API double that records every call
///
/// Each submitted mutation gets its own operation id; fetching that id
/// returns the terminal record chosen by the configured [`Outcome`].
#[derive(Default)]
pub struct RecordingSubmitter {
    calls: Mutex<Vec<Mutation>>,
    outcomes: Mutex<Vec<(Mutation, Outcome)>>,
    operations: Mutex<Vec<(String, Outcome)>>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the outcome for a specific mutation (default: succeed)
    pub fn with_outcome(self, mutation: Mutation, outcome: Outcome) -> Self {
        lock(&self.outcomes).push((mutation, outcome));
        self
    }

    /// Every mutation submitted, in order
    pub fn calls(&self) -> Vec<Mutation> {
        lock(&self.calls).clone()
    }

    pub fn attach_calls(&self) -> Vec<AttachmentRecord> {
        self.calls()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::Attach(record) => Some(record),
                Mutation::Detach(_) => None,
            })
            .collect()
    }

    pub fn detach_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::Detach(record) => Some(record.id),
                Mutation::Attach(_) => None,
            })
            .collect()
    }

    fn submit(&self, project_id: &str, mutation: Mutation) -> Result<OperationHandle, ApiError> {
        let outcome = lock(&self.outcomes)
            .iter()
            .find(|(m, _)| *m == mutation)
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or(Outcome::Succeed);
        lock(&self.calls).push(mutation);

        if let Outcome::Reject(message) = outcome {
            return Err(server_error(&message));
        }

        let mut operations = lock(&self.operations);
        let operation_id = format!("op-{}", operations.len() + 1);
        operations.push((operation_id.clone(), outcome));
        Ok(OperationHandle::new(
            operation_id,
            project_id,
            OperationKind::Instance,
        ))
    }
}

#[async_trait]
impl StatusFetcher for RecordingSubmitter {
    async fn fetch(
        &self,
        _project_id: &str,
        operation_id: &str,
        _kind: OperationKind,
    ) -> Result<Operation, ApiError> {
        let operations = lock(&self.operations);
        match operations.iter().find(|(id, _)| id == operation_id) {
            Some((_, Outcome::Fail(message))) => Ok(failed(operation_id, "failed", message)),
            Some(_) => Ok(succeeded(operation_id, Value::Null)),
            None => Err(ApiError::Status {
                status: 404,
                message: format!("unknown operation {operation_id}"),
            }),
        }
    }
}

#[async_trait]
impl AttachmentSubmitter for RecordingSubmitter {
    async fn attach(
        &self,
        project_id: &str,
        _instance_id: &str,
        record: &AttachmentRecord,
    ) -> Result<OperationHandle, ApiError> {
        self.submit(project_id, Mutation::Attach(record.clone()))
    }

    async fn detach(
        &self,
        project_id: &str,
        _instance_id: &str,
        record: &AttachmentRecord,
    ) -> Result<OperationHandle, ApiError> {
        self.submit(project_id, Mutation::Detach(record.clone()))
    }
}
