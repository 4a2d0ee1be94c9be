//! Converging a VM's disk attachments on a desired set
//!
//! The reconciler diffs observed against desired attachments, then issues
//! one detach per removed attachment followed by one attach per added
//! attachment. Each mutation is its own operation and is awaited before the
//! next one is submitted, so every detach is finished before the first attach
//! goes out. The first failure stops the pass; nothing already applied is
//! rolled back, and the error lists what was applied.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::attachment::{AttachmentRecord, DiffResult, diff, duplicate_id, order_like};
use crate::error::{CoreError, Result};
use crate::operation::{Clock, OperationHandle, Poller, StatusFetcher};

/// Submits attachment mutations for a VM
///
/// Each call starts one server-side operation and returns its handle; the
/// same implementation fetches the status of those operations.
#[async_trait]
pub trait AttachmentSubmitter: StatusFetcher {
    async fn attach(
        &self,
        project_id: &str,
        instance_id: &str,
        record: &AttachmentRecord,
    ) -> std::result::Result<OperationHandle, ApiError>;

    async fn detach(
        &self,
        project_id: &str,
        instance_id: &str,
        record: &AttachmentRecord,
    ) -> std::result::Result<OperationHandle, ApiError>;
}

/// A single attach or detach
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "attachment", rename_all = "lowercase")]
pub enum Mutation {
    Attach(AttachmentRecord),
    Detach(AttachmentRecord),
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Attach(record) => write!(f, "attach {record}"),
            Mutation::Detach(record) => write!(f, "detach {record}"),
        }
    }
}

/// Identifies the VM being reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub project_id: String,
    pub instance_id: String,
}

impl ParentRef {
    pub fn new(project_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// Result of a fully applied reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub detached: Vec<AttachmentRecord>,
    pub attached: Vec<AttachmentRecord>,
    /// Attachments now on the VM, in the caller's desired order
    pub attachments: Vec<AttachmentRecord>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.detached.is_empty() && self.attached.is_empty()
    }
}

/// Reject a desired set that names the same disk more than once
pub fn validate_desired(desired: &[AttachmentRecord]) -> Result<()> {
    match duplicate_id(desired) {
        Some(disk_id) => Err(CoreError::InvalidDesired {
            disk_id: disk_id.to_string(),
        }),
        None => Ok(()),
    }
}

/// The mutations a reconcile pass issues, in issue order: every detach,
/// then every attach.
///
/// Fails with [`CoreError::InvalidDesired`] when `desired` names a disk twice.
pub fn plan(observed: &[AttachmentRecord], desired: &[AttachmentRecord]) -> Result<Vec<Mutation>> {
    validate_desired(desired)?;
    let DiffResult { added, removed } = diff(observed, desired);
    Ok(removed
        .into_iter()
        .map(Mutation::Detach)
        .chain(added.into_iter().map(Mutation::Attach))
        .collect())
}

/// Applies attachment diffs through a submitter and a poller
pub struct Reconciler<'a, S: ?Sized, C> {
    submitter: &'a S,
    poller: &'a Poller<C>,
}

impl<'a, S, C> Reconciler<'a, S, C>
where
    S: AttachmentSubmitter + ?Sized,
    C: Clock,
{
    pub fn new(submitter: &'a S, poller: &'a Poller<C>) -> Self {
        Self { submitter, poller }
    }

    /// Move the VM's attachments from `observed` to `desired`.
    ///
    /// `observed` must be freshly read; after a [`CoreError::PartialReconcile`]
    /// the VM has to be read again before retrying.
    pub async fn reconcile(
        &self,
        parent: &ParentRef,
        observed: &[AttachmentRecord],
        desired: &[AttachmentRecord],
    ) -> Result<ReconcileOutcome> {
        let plan = plan(observed, desired)?;
        if plan.is_empty() {
            debug!(
                "Attachments of instance {} already match",
                parent.instance_id
            );
            return Ok(ReconcileOutcome {
                attachments: desired.to_vec(),
                ..ReconcileOutcome::default()
            });
        }

        info!(
            "Reconciling instance {}: {} mutation(s)",
            parent.instance_id,
            plan.len()
        );

        let mut applied = Vec::with_capacity(plan.len());
        for mutation in plan {
            if let Err(err) = self.apply(parent, &mutation).await {
                warn!(
                    "Reconcile of instance {} stopped at '{}' after {} applied: {}",
                    parent.instance_id,
                    mutation,
                    applied.len(),
                    err
                );
                return Err(CoreError::PartialReconcile {
                    applied,
                    failed: mutation,
                    source: Box::new(err),
                });
            }
            applied.push(mutation);
        }

        let mut outcome = ReconcileOutcome::default();
        for mutation in applied {
            match mutation {
                Mutation::Detach(record) => outcome.detached.push(record),
                Mutation::Attach(record) => outcome.attached.push(record),
            }
        }
        let mut current: Vec<_> = observed
            .iter()
            .filter(|record| !outcome.detached.contains(record))
            .cloned()
            .collect();
        current.extend(outcome.attached.iter().cloned());
        outcome.attachments = order_like(desired, &current);

        Ok(outcome)
    }

    async fn apply(&self, parent: &ParentRef, mutation: &Mutation) -> Result<()> {
        info!("Instance {}: {}", parent.instance_id, mutation);
        let handle = match mutation {
            Mutation::Detach(record) => {
                self.submitter
                    .detach(&parent.project_id, &parent.instance_id, record)
                    .await?
            }
            Mutation::Attach(record) => {
                self.submitter
                    .attach(&parent.project_id, &parent.instance_id, record)
                    .await?
            }
        };
        self.poller.await_operation(&handle, self.submitter).await?;
        Ok(())
    }
}
