use anyhow::Result;
use clap::Parser;
use cloudctl_core::Config;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use commands::CommandContext;
use connection::ConnectionManager;
use error::CliError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let config_result = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        Config::load_from_path(&path).map(|config| (config, Some(path)))
    } else {
        debug!("Loading config from default location");
        Config::load().map(|config| (config, None))
    };
    let (config, config_path) = match config_result {
        Ok(loaded) => loaded,
        Err(e) => exit_with(CliError::from(e)),
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    // Ctrl-C stops waiting; operations already submitted keep running server-side
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no longer waiting for operations");
            ctrl_c_token.cancel();
        }
    });

    if let Err(e) = execute_command(&cli, &conn_mgr, cancel).await {
        exit_with(e);
    }

    Ok(())
}

fn exit_with(err: CliError) -> ! {
    err.print_diagnostic();
    std::process::exit(err.exit_code());
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "cloudctl=warn,cloudctl_core=warn",
            1 => "cloudctl=info,cloudctl_core=info",
            2 => "cloudctl=debug,cloudctl_core=debug",
            _ => "cloudctl=trace,cloudctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(
    cli: &Cli,
    conn_mgr: &ConnectionManager,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    info!("Executing command: {}", format_command(&cli.command));

    let ctx = CommandContext {
        conn_mgr,
        profile: cli.profile.as_deref(),
        project: cli.project.as_deref(),
        output: cli.output,
        poll: conn_mgr.poll_config(cli.wait_timeout, cli.wait_interval),
        cancel,
    };

    match &cli.command {
        Commands::Disk(cmd) => commands::disk::handle_disk_command(&ctx, cmd).await,
        Commands::Vm(cmd) => commands::vm::handle_vm_command(&ctx, cmd).await,
        Commands::Operation(cmd) => commands::operation::handle_operation_command(&ctx, cmd).await,
    }
}

/// Short command name for logging
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Disk(cmd) => format!("disk {:?}", cmd),
        Commands::Vm(cmd) => format!("vm {:?}", cmd),
        Commands::Operation(cmd) => format!("operation {:?}", cmd),
    }
}
