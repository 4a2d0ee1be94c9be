//! Disk workflows
//!
//! Each workflow submits one mutation, awaits its operation, and for create
//! and resize decodes the resulting disk from the operation payload.

use tracing::{debug, info};

use super::params::CreateDiskParams;
use crate::api::{ApiClient, Disk, DiskResizeRequest};
use crate::error::Result;
use crate::operation::{Clock, Poller, await_and_resolve};

/// Create a disk and wait for completion
///
/// # Example
///
/// ```rust,ignore
/// use cloudctl_core::workflows::{CreateDiskParams, create_disk_and_wait};
///
/// let params = CreateDiskParams::new("scratch", "us-east1-a", "200GiB");
/// let disk = create_disk_and_wait(&client, &poller, "proj-1", params).await?;
/// println!("Created disk {} ({})", disk.name, disk.id);
/// ```
pub async fn create_disk_and_wait<C: Clock>(
    client: &ApiClient,
    poller: &Poller<C>,
    project_id: &str,
    params: CreateDiskParams,
) -> Result<Disk> {
    let request = params.into_request();
    info!(
        "Creating {} disk '{}' in project {}",
        request.disk_type, request.name, project_id
    );

    let handle = client.create_disk(project_id, &request).await?;
    await_and_resolve(poller, &handle, client).await
}

/// Resize a disk and wait for completion
///
/// The API only grows disks, and an attached disk can only be resized while
/// its VM is powered off; both are enforced server-side.
pub async fn resize_disk_and_wait<C: Clock>(
    client: &ApiClient,
    poller: &Poller<C>,
    project_id: &str,
    disk_id: &str,
    size: &str,
) -> Result<Disk> {
    info!("Resizing disk {} to {}", disk_id, size);
    let request = DiskResizeRequest {
        size: size.to_string(),
    };

    let handle = client.resize_disk(project_id, disk_id, &request).await?;
    await_and_resolve(poller, &handle, client).await
}

/// Delete a disk and wait for completion
pub async fn delete_disk_and_wait<C: Clock>(
    client: &ApiClient,
    poller: &Poller<C>,
    project_id: &str,
    disk_id: &str,
) -> Result<()> {
    info!("Deleting disk {} from project {}", disk_id, project_id);

    let handle = client.delete_disk(project_id, disk_id).await?;
    poller.await_operation(&handle, client).await?;
    Ok(())
}

/// Look up a disk by id
///
/// `None` means the disk no longer exists, typically because it was deleted
/// outside of this tool.
pub async fn find_disk(client: &ApiClient, project_id: &str, disk_id: &str) -> Result<Option<Disk>> {
    let disks = client.list_disks(project_id).await?;
    let found = disks.into_iter().find(|disk| disk.id == disk_id);
    if found.is_none() {
        debug!("Disk {} not found in project {}", disk_id, project_id);
    }
    Ok(found)
}
