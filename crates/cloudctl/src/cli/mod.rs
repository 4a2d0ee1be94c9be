//! CLI structure and command definitions

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use cloudctl_core::OperationKind;
use cloudctl_core::attachment::AttachmentRecord;

use crate::output::OutputFormat;

/// Manage cloud disks and their VM attachments
#[derive(Parser, Debug)]
#[command(name = "cloudctl")]
#[command(version, about = "Manage cloud disks and their VM attachments")]
#[command(long_about = "
Manage cloud disks and their VM attachments

Every change is a long-running operation on the server; cloudctl waits for
it to finish and reports the resulting resource.

EXAMPLES:
    # Create a disk in the profile's default project
    cloudctl disk create --name scratch --location us-east1-a --size 200GiB

    # Attach exactly these data disks to a VM (detaching any others)
    cloudctl vm disks vm-1 --disk disk-1 --disk disk-2:ro

    # Preview the attach/detach plan without applying it
    cloudctl vm disks vm-1 --disk disk-1 --dry-run

    # Keep waiting for an operation that outlived --wait-timeout
    cloudctl operation wait 6a1c... --kind instance

For more help on a specific command, run:
    cloudctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "CLOUDCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "CLOUDCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Project to operate on (default: the profile's default_project)
    #[arg(long, global = true, env = "CLOUDCTL_PROJECT")]
    pub project: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum time to wait for each operation, in seconds
    #[arg(long, global = true)]
    pub wait_timeout: Option<u64>,

    /// Polling interval in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Disk operations
    #[command(subcommand)]
    Disk(DiskCommands),

    /// VM instance operations
    #[command(subcommand)]
    Vm(VmCommands),

    /// Long-running operation tracking
    #[command(subcommand, visible_alias = "op")]
    Operation(OperationCommands),
}

#[derive(Subcommand, Debug)]
pub enum DiskCommands {
    /// List disks in the project
    #[command(visible_alias = "ls")]
    List,

    /// Show one disk
    Get {
        /// Disk ID
        id: String,
    },

    /// Create a disk and wait until it exists
    #[command(after_help = "EXAMPLES:
    cloudctl disk create --name scratch --location us-east1-a --size 200GiB
    cloudctl disk create --name shared --location us-east1-a --size 10TiB --type shared-volume
")]
    Create {
        /// Disk name
        #[arg(long)]
        name: String,

        /// Location, e.g. us-east1-a
        #[arg(long)]
        location: String,

        /// Size with unit, e.g. 200GiB or 1TiB
        #[arg(long)]
        size: String,

        /// Disk type (default: persistent-ssd)
        #[arg(long = "type")]
        disk_type: Option<String>,

        /// Block size in bytes (default for persistent-ssd: 4096)
        #[arg(long, value_parser = parse_block_size)]
        block_size: Option<u64>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Grow a disk
    Resize {
        /// Disk ID
        id: String,

        /// New size with unit; must be larger than the current size
        #[arg(long)]
        size: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete a disk
    Delete {
        /// Disk ID
        id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum VmCommands {
    /// Show one VM and its attached disks
    Get {
        /// VM instance ID
        id: String,
    },

    /// Set the data disks attached to a VM
    ///
    /// Disks not listed are detached, listed disks that are missing are
    /// attached. Changing a disk's mode detaches and re-attaches it. Boot
    /// disks are never touched.
    #[command(group(ArgGroup::new("desired").required(true).args(["disk", "none"])))]
    #[command(after_help = "EXAMPLES:
    # disk-1 read-write, disk-2 read-only
    cloudctl vm disks vm-1 --disk disk-1 --disk disk-2:ro

    # Detach every data disk
    cloudctl vm disks vm-1 --none
")]
    Disks {
        /// VM instance ID
        id: String,

        /// Desired attachment as DISK_ID[:MODE], MODE is rw (default) or ro
        #[arg(long = "disk", value_name = "DISK_ID[:MODE]")]
        disk: Vec<AttachmentRecord>,

        /// Detach every data disk
        #[arg(long)]
        none: bool,

        /// Print the planned detaches and attaches without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Wait for an operation to finish and show its final record
    Wait {
        /// Operation ID
        id: String,

        /// Which API the operation belongs to
        #[arg(long, value_enum)]
        kind: OperationKindArg,
    },
}

/// Options for commands that start an operation
#[derive(Args, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Return as soon as the operation is submitted
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationKindArg {
    Disk,
    Instance,
}

impl From<OperationKindArg> for OperationKind {
    fn from(kind: OperationKindArg) -> Self {
        match kind {
            OperationKindArg::Disk => OperationKind::Disk,
            OperationKindArg::Instance => OperationKind::Instance,
        }
    }
}

fn parse_block_size(s: &str) -> Result<u64, String> {
    let size: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if cloudctl_core::workflows::SUPPORTED_BLOCK_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("block size must be 512 or 4096, got {size}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use cloudctl_core::attachment::AttachmentMode;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vm_disks() {
        let cli = Cli::try_parse_from([
            "cloudctl", "vm", "disks", "vm-1", "--disk", "d-1", "--disk", "d-2:ro", "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Vm(VmCommands::Disks {
                id, disk, dry_run, ..
            }) => {
                assert_eq!(id, "vm-1");
                assert!(dry_run);
                assert_eq!(
                    disk,
                    vec![
                        AttachmentRecord::data("d-1", AttachmentMode::ReadWrite),
                        AttachmentRecord::data("d-2", AttachmentMode::ReadOnly),
                    ]
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_vm_disks_requires_desired_state() {
        assert!(Cli::try_parse_from(["cloudctl", "vm", "disks", "vm-1"]).is_err());
        assert!(Cli::try_parse_from(["cloudctl", "vm", "disks", "vm-1", "--none"]).is_ok());
        assert!(
            Cli::try_parse_from(["cloudctl", "vm", "disks", "vm-1", "--none", "--disk", "d"])
                .is_err()
        );
    }

    #[test]
    fn test_invalid_attachment_mode_is_rejected() {
        assert!(Cli::try_parse_from(["cloudctl", "vm", "disks", "vm-1", "--disk", "d:rx"]).is_err());
    }

    #[test]
    fn test_block_size_validation() {
        assert_eq!(parse_block_size("512"), Ok(512));
        assert!(parse_block_size("1024").is_err());
        assert!(parse_block_size("big").is_err());
    }

    #[test]
    fn test_global_wait_flags() {
        let cli = Cli::try_parse_from([
            "cloudctl", "disk", "delete", "d-1", "--wait-timeout", "30", "--wait-interval", "2",
        ])
        .unwrap();
        assert_eq!(cli.wait_timeout, Some(30));
        assert_eq!(cli.wait_interval, Some(2));
        assert!(Cli::try_parse_from(["cloudctl", "disk", "list", "--wait-interval", "0"]).is_err());
    }
}
