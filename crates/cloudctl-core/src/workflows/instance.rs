//! VM disk attachment workflows

use tracing::debug;

use crate::api::{ApiClient, Instance};
use crate::attachment::{AttachmentRecord, AttachmentType};
use crate::error::Result;
use crate::operation::{Clock, Poller};
use crate::reconcile::{Mutation, ParentRef, ReconcileOutcome, Reconciler, plan, validate_desired};

/// The instance's data disk attachments
///
/// Boot disks are managed with the VM itself and never take part in a
/// reconcile.
pub fn observed_disk_attachments(instance: &Instance) -> Vec<AttachmentRecord> {
    instance
        .disks
        .iter()
        .filter(|disk| disk.attachment_type != AttachmentType::Os)
        .map(AttachmentRecord::from)
        .collect()
}

/// Read the instance and compute the mutations that would converge its data
/// disks on `desired`, without applying them
pub async fn plan_instance_disks(
    client: &ApiClient,
    project_id: &str,
    instance_id: &str,
    desired: &[AttachmentRecord],
) -> Result<Vec<Mutation>> {
    validate_desired(desired)?;
    let instance = client.get_instance(project_id, instance_id).await?;
    plan(&observed_disk_attachments(&instance), desired)
}

/// Converge an instance's data disks on `desired` and wait for every
/// mutation to finish
///
/// The instance is always read fresh first. On a partial failure the error
/// lists the mutations that already took effect.
pub async fn update_instance_disks_and_wait<C: Clock>(
    client: &ApiClient,
    poller: &Poller<C>,
    project_id: &str,
    instance_id: &str,
    desired: &[AttachmentRecord],
) -> Result<ReconcileOutcome> {
    validate_desired(desired)?;
    let instance = client.get_instance(project_id, instance_id).await?;
    let observed = observed_disk_attachments(&instance);
    debug!(
        "Instance {} has {} data disk(s) attached",
        instance_id,
        observed.len()
    );

    let parent = ParentRef::new(project_id, instance_id);
    Reconciler::new(client, poller)
        .reconcile(&parent, &observed, desired)
        .await
}
