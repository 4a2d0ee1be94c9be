//! `cloudctl disk` commands

use cloudctl_core::api::{Disk, DiskResizeRequest};
use cloudctl_core::workflows::{
    self, CreateDiskParams, create_disk_and_wait, delete_disk_and_wait, resize_disk_and_wait,
};
use serde::Serialize;
use tracing::debug;

use super::{CommandContext, SubmittedOperation};
use crate::cli::DiskCommands;
use crate::error::{CliError, Result as CliResult};
use crate::output::print_output;

/// Flat view of a disk for table output
#[derive(Debug, Serialize)]
struct DiskRow<'a> {
    id: &'a str,
    name: &'a str,
    location: &'a str,
    #[serde(rename = "type")]
    disk_type: &'a str,
    size: &'a str,
    block_size: u64,
    serial_number: &'a str,
}

impl<'a> From<&'a Disk> for DiskRow<'a> {
    fn from(disk: &'a Disk) -> Self {
        Self {
            id: &disk.id,
            name: &disk.name,
            location: &disk.location,
            disk_type: &disk.disk_type,
            size: &disk.size,
            block_size: disk.block_size,
            serial_number: disk.serial_number.as_deref().unwrap_or("-"),
        }
    }
}

pub async fn handle_disk_command(ctx: &CommandContext<'_>, command: &DiskCommands) -> CliResult<()> {
    let client = ctx.client()?;
    let project_id = ctx.project_id()?;
    debug!("Disk command in project {}", project_id);

    match command {
        DiskCommands::List => {
            let disks = client.list_disks(&project_id).await?;
            if ctx.output.is_table() {
                let rows: Vec<DiskRow> = disks.iter().map(DiskRow::from).collect();
                print_output(rows, ctx.output)?;
            } else {
                print_output(disks, ctx.output)?;
            }
        }
        DiskCommands::Get { id } => {
            let disk = workflows::find_disk(&client, &project_id, id)
                .await?
                .ok_or_else(|| CliError::DiskNotFound {
                    disk_id: id.clone(),
                    project_id: project_id.clone(),
                })?;
            print_disk(ctx, &disk)?;
        }
        DiskCommands::Create {
            name,
            location,
            size,
            disk_type,
            block_size,
            wait,
        } => {
            let mut params = CreateDiskParams::new(name, location, size);
            if let Some(disk_type) = disk_type {
                params = params.with_type(disk_type);
            }
            if let Some(block_size) = block_size {
                params = params.with_block_size(*block_size);
            }

            if wait.no_wait {
                let handle = client.create_disk(&project_id, &params.into_request()).await?;
                return print_submitted(ctx, SubmittedOperation::from(&handle));
            }

            let (poller, pb) = ctx.poller(format!("Creating disk {}", name));
            let result = create_disk_and_wait(&client, &poller, &project_id, params).await;
            pb.finish_and_clear();
            print_disk(ctx, &result?)?;
        }
        DiskCommands::Resize { id, size, wait } => {
            if wait.no_wait {
                let request = DiskResizeRequest { size: size.clone() };
                let handle = client.resize_disk(&project_id, id, &request).await?;
                return print_submitted(ctx, SubmittedOperation::from(&handle));
            }

            let (poller, pb) = ctx.poller(format!("Resizing disk {} to {}", id, size));
            let result = resize_disk_and_wait(&client, &poller, &project_id, id, size).await;
            pb.finish_and_clear();
            print_disk(ctx, &result?)?;
        }
        DiskCommands::Delete { id, wait } => {
            if wait.no_wait {
                let handle = client.delete_disk(&project_id, id).await?;
                return print_submitted(ctx, SubmittedOperation::from(&handle));
            }

            let (poller, pb) = ctx.poller(format!("Deleting disk {}", id));
            let result = delete_disk_and_wait(&client, &poller, &project_id, id).await;
            pb.finish_and_clear();
            result?;
            if ctx.output.is_table() {
                println!("Disk {} deleted", id);
            } else {
                print_output(serde_json::json!({"id": id, "deleted": true}), ctx.output)?;
            }
        }
    }

    Ok(())
}

fn print_disk(ctx: &CommandContext<'_>, disk: &Disk) -> CliResult<()> {
    if ctx.output.is_table() {
        print_output(DiskRow::from(disk), ctx.output)?;
    } else {
        print_output(disk, ctx.output)?;
    }
    Ok(())
}

fn print_submitted(ctx: &CommandContext<'_>, submitted: SubmittedOperation) -> CliResult<()> {
    if ctx.output.is_table() {
        println!("Submitted {} operation {}", submitted.kind, submitted.operation_id);
        println!(
            "To wait for completion, run: cloudctl operation wait {} --kind {}",
            submitted.operation_id, submitted.kind
        );
    } else {
        print_output(submitted, ctx.output)?;
    }
    Ok(())
}
