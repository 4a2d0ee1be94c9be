//! `cloudctl operation` commands

use cloudctl_core::{OperationHandle, OperationKind};

use super::CommandContext;
use crate::cli::OperationCommands;
use crate::error::Result as CliResult;
use crate::output::print_output;

pub async fn handle_operation_command(
    ctx: &CommandContext<'_>,
    command: &OperationCommands,
) -> CliResult<()> {
    match command {
        OperationCommands::Wait { id, kind } => {
            let client = ctx.client()?;
            let project_id = ctx.project_id()?;
            let kind = OperationKind::from(*kind);
            let handle = OperationHandle::new(id.as_str(), project_id, kind);

            let (poller, pb) = ctx.poller(format!("Waiting for {} operation {}", kind, id));
            let result = poller.await_operation(&handle, &client).await;
            pb.finish_and_clear();
            let operation = result?;

            if ctx.output.is_table() {
                println!("Operation {} {}", operation.operation_id, operation.state);
            }
            print_output(&operation, ctx.output)?;
        }
    }
    Ok(())
}
