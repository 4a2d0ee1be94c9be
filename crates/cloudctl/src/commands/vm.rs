//! `cloudctl vm` commands

use cloudctl_core::Mutation;
use cloudctl_core::api::{Instance, NetworkInterface};
use cloudctl_core::attachment::AttachmentRecord;
use cloudctl_core::reconcile::validate_desired;
use cloudctl_core::workflows::{plan_instance_disks, update_instance_disks_and_wait};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use super::CommandContext;
use crate::cli::VmCommands;
use crate::error::Result as CliResult;
use crate::output::print_output;

/// One line of a plan or outcome table
#[derive(Debug, Serialize, PartialEq, Eq)]
struct MutationRow {
    action: &'static str,
    disk_id: String,
    mode: String,
}

impl From<&Mutation> for MutationRow {
    fn from(mutation: &Mutation) -> Self {
        let (action, record) = match mutation {
            Mutation::Detach(record) => ("detach", record),
            Mutation::Attach(record) => ("attach", record),
        };
        Self {
            action,
            disk_id: record.id.clone(),
            mode: record.mode.to_string(),
        }
    }
}

/// One line of the network interface table
#[derive(Debug, Serialize, PartialEq, Eq)]
struct InterfaceRow<'a> {
    name: &'a str,
    network: &'a str,
    subnet: &'a str,
    interface_type: &'a str,
    private_ipv4: &'a str,
    public_ipv4: &'a str,
}

impl<'a> From<&'a NetworkInterface> for InterfaceRow<'a> {
    fn from(nic: &'a NetworkInterface) -> Self {
        Self {
            name: &nic.name,
            network: &nic.network,
            subnet: &nic.subnet,
            interface_type: &nic.interface_type,
            private_ipv4: nic.private_ipv4().unwrap_or("-"),
            public_ipv4: nic.public_ipv4().unwrap_or("-"),
        }
    }
}

pub async fn handle_vm_command(ctx: &CommandContext<'_>, command: &VmCommands) -> CliResult<()> {
    if let VmCommands::Disks { disk, .. } = command {
        validate_desired(disk)?;
    }

    let client = ctx.client()?;
    let project_id = ctx.project_id()?;

    match command {
        VmCommands::Get { id } => {
            let instance = client.get_instance(&project_id, id).await?;
            print_instance(ctx, &instance)?;
        }
        VmCommands::Disks {
            id,
            disk,
            none: _,
            dry_run,
        } => {
            // `--none` and `--disk` are exclusive, so an empty list means detach all
            let desired: &[AttachmentRecord] = disk;

            if *dry_run {
                let plan = plan_instance_disks(&client, &project_id, id, desired).await?;
                print_plan(ctx, &plan)?;
                return Ok(());
            }

            let (poller, pb) = ctx.poller(format!("Updating disks of VM {}", id));
            let result =
                update_instance_disks_and_wait(&client, &poller, &project_id, id, desired).await;
            pb.finish_and_clear();
            let outcome = result?;

            if ctx.output.is_table() {
                if outcome.is_noop() {
                    println!("Disks of VM {} already match", id);
                } else {
                    println!(
                        "VM {}: {} detached, {} attached",
                        id,
                        outcome.detached.len(),
                        outcome.attached.len()
                    );
                }
                print_output(&outcome.attachments, ctx.output)?;
            } else {
                print_output(&outcome, ctx.output)?;
            }
        }
    }

    Ok(())
}

fn print_instance(ctx: &CommandContext<'_>, instance: &Instance) -> CliResult<()> {
    if let Some(warning) = missing_ips_warning(instance) {
        warn!("{}", warning);
        eprintln!("{}{}{}", "warning".yellow().bold(), ": ".bold(), warning);
    }

    if !ctx.output.is_table() {
        print_output(instance_document(instance)?, ctx.output)?;
        return Ok(());
    }

    print_output(instance_summary(instance), ctx.output)?;
    println!("Disks:");
    print_output(&instance.disks, ctx.output)?;
    println!("Network interfaces:");
    let rows: Vec<InterfaceRow> = instance
        .network_interfaces
        .iter()
        .map(InterfaceRow::from)
        .collect();
    print_output(rows, ctx.output)?;
    Ok(())
}

/// Key/value summary shown above the disk and interface tables
fn instance_summary(instance: &Instance) -> Value {
    json!({
        "id": instance.id,
        "name": instance.name,
        "location": instance.location,
        "type": instance.instance_type,
        "state": instance.state,
        "reservation_id": instance.reservation_id,
        "internal_dns_name": instance.internal_dns_name(),
        "external_dns_name": instance.external_dns_name(),
        "ib_partition_id": instance.ib_partition_id(),
    })
}

/// The instance as returned by the API plus its derived DNS names
fn instance_document(instance: &Instance) -> CliResult<Value> {
    let mut doc = serde_json::to_value(instance)?;
    if let Value::Object(map) = &mut doc {
        map.insert(
            "internal_dns_name".to_string(),
            Value::String(instance.internal_dns_name()),
        );
        map.insert(
            "external_dns_name".to_string(),
            instance
                .external_dns_name()
                .map_or(Value::Null, |name| Value::String(name.to_string())),
        );
    }
    Ok(doc)
}

fn missing_ips_warning(instance: &Instance) -> Option<String> {
    let names: Vec<&str> = instance
        .interfaces_missing_ips()
        .map(|nic| if nic.name.is_empty() { nic.id.as_str() } else { nic.name.as_str() })
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(format!(
        "network interface(s) {} of VM {} have no IP addresses",
        names.join(", "),
        instance.id
    ))
}

fn print_plan(ctx: &CommandContext<'_>, plan: &[Mutation]) -> CliResult<()> {
    if ctx.output.is_table() {
        if plan.is_empty() {
            println!("No changes: attached disks already match");
            return Ok(());
        }
        let rows: Vec<MutationRow> = plan.iter().map(MutationRow::from).collect();
        print_output(rows, ctx.output)?;
    } else {
        print_output(plan, ctx.output)?;
    }
    Ok(())
}
