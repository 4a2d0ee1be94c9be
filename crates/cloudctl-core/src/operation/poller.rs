//! Operation polling
//!
//! Drives an [`OperationHandle`] to a terminal state with a fixed polling
//! interval, a ceiling on total wait, bounded retries for transport failures
//! and cooperative cancellation.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Operation, OperationHandle, OperationState, OperationStatus, StatusFetcher};
use crate::config::PollConfig;
use crate::error::{CoreError, Result};
use crate::progress::{ProgressCallback, ProgressEvent, emit};

/// Time source and sleep primitive used between polls
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Awaits long-running operations
///
/// One poller can await many handles, one at a time or from independent
/// tasks; it keeps no per-operation state.
///
/// # Example
///
/// ```rust,ignore
/// use cloudctl_core::config::PollConfig;
/// use cloudctl_core::operation::Poller;
///
/// let poller = Poller::new(PollConfig::default());
/// let handle = client.delete_disk(project_id, disk_id).await?;
/// poller.await_operation(&handle, &client).await?;
/// ```
pub struct Poller<C = TokioClock> {
    config: PollConfig,
    clock: C,
    cancel: CancellationToken,
    on_progress: Option<ProgressCallback>,
}

impl Poller<TokioClock> {
    pub fn new(config: PollConfig) -> Self {
        Self::with_clock(config, TokioClock)
    }
}

impl<C: Clock> Poller<C> {
    pub fn with_clock(config: PollConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Stop waiting as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report polling progress to `callback`
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Await an operation and fail with [`CoreError::OperationFailed`] when
    /// the server reports it failed.
    pub async fn await_operation<F>(&self, handle: &OperationHandle, fetcher: &F) -> Result<Operation>
    where
        F: StatusFetcher + ?Sized,
    {
        let operation = self.poll_until_terminal(handle, fetcher).await?;
        match operation.status() {
            OperationStatus::Failed(cause) => Err(CoreError::OperationFailed {
                operation_id: operation.operation_id.clone(),
                cause,
            }),
            _ => Ok(operation),
        }
    }

    /// Poll until the server reports a terminal state and return that record,
    /// whether it succeeded or failed.
    pub async fn poll_until_terminal<F>(
        &self,
        handle: &OperationHandle,
        fetcher: &F,
    ) -> Result<Operation>
    where
        F: StatusFetcher + ?Sized,
    {
        let operation_id = handle.operation_id();
        let start = self.clock.now();
        let timeout = self.config.timeout();
        let mut failures = 0u32;

        debug!("Awaiting {}", handle);
        emit(
            &self.on_progress,
            ProgressEvent::Started {
                operation_id: operation_id.to_string(),
            },
        );

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(handle));
            }

            // A fetch that never answers must not outlive the wait ceiling.
            // At the ceiling itself the final fetch still gets one interval.
            let budget = timeout
                .saturating_sub(self.elapsed(start))
                .max(self.config.interval());
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(handle)),
                result = fetcher.fetch(handle.project_id(), operation_id, handle.kind()) => result,
                _ = self.clock.sleep(budget) => {
                    let elapsed = self.elapsed(start);
                    warn!(
                        "Status fetch for operation {} did not answer; timed out after {:?}",
                        operation_id, elapsed
                    );
                    return Err(CoreError::Timeout {
                        operation_id: operation_id.to_string(),
                        waited: elapsed,
                    });
                }
            };

            let wait = match fetched {
                Ok(operation) => {
                    failures = 0;
                    if operation.state.is_terminal() {
                        self.report_terminal(&operation);
                        return Ok(operation);
                    }
                    let elapsed = self.elapsed(start);
                    debug!(
                        "Operation {} is {} after {:?}",
                        operation_id, operation.state, elapsed
                    );
                    emit(
                        &self.on_progress,
                        ProgressEvent::Polling {
                            operation_id: operation_id.to_string(),
                            state: operation.state,
                            elapsed,
                        },
                    );
                    self.config.interval()
                }
                Err(err) => {
                    failures += 1;
                    if failures > self.config.transport_retries {
                        warn!(
                            "Giving up on operation {} after {} failed status fetches: {}",
                            operation_id, failures, err
                        );
                        return Err(CoreError::Transport(err));
                    }
                    warn!(
                        "Status fetch for operation {} failed (attempt {}/{}): {}",
                        operation_id, failures, self.config.transport_retries, err
                    );
                    emit(
                        &self.on_progress,
                        ProgressEvent::Retrying {
                            operation_id: operation_id.to_string(),
                            attempt: failures,
                            error: err.to_string(),
                        },
                    );
                    self.config.backoff(failures)
                }
            };

            let elapsed = self.elapsed(start);
            if elapsed >= timeout {
                warn!("Operation {} timed out after {:?}", operation_id, elapsed);
                return Err(CoreError::Timeout {
                    operation_id: operation_id.to_string(),
                    waited: elapsed,
                });
            }

            // Never sleep past the deadline; the next poll happens right at it
            self.pause(handle, wait.min(timeout - elapsed)).await?;
        }
    }

    async fn pause(&self, handle: &OperationHandle, wait: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled(handle)),
            _ = self.clock.sleep(wait) => Ok(()),
        }
    }

    fn elapsed(&self, start: Instant) -> Duration {
        self.clock.now().saturating_duration_since(start)
    }

    fn cancelled(&self, handle: &OperationHandle) -> CoreError {
        info!("Stopped waiting for {}", handle);
        CoreError::Cancelled {
            operation_id: handle.operation_id().to_string(),
        }
    }

    fn report_terminal(&self, operation: &Operation) {
        let operation_id = operation.operation_id.clone();
        match operation.status() {
            OperationStatus::Failed(cause) => {
                info!("Operation {} failed: {}", operation_id, cause);
                emit(
                    &self.on_progress,
                    ProgressEvent::Failed {
                        operation_id,
                        error: cause.to_string(),
                    },
                );
            }
            _ => {
                debug_assert_eq!(operation.state, OperationState::Succeeded);
                info!("Operation {} succeeded", operation_id);
                emit(&self.on_progress, ProgressEvent::Completed { operation_id });
            }
        }
    }
}
