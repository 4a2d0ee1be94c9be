//! Command implementations

pub mod disk;
pub mod operation;
pub mod progress;
pub mod vm;

use cloudctl_core::{ApiClient, OperationHandle, PollConfig, Poller};
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::OutputFormat;

/// Everything a command needs from the global flags
pub struct CommandContext<'a> {
    pub conn_mgr: &'a ConnectionManager,
    pub profile: Option<&'a str>,
    pub project: Option<&'a str>,
    pub output: OutputFormat,
    pub poll: PollConfig,
    pub cancel: CancellationToken,
}

impl CommandContext<'_> {
    pub fn client(&self) -> CliResult<ApiClient> {
        self.conn_mgr.create_client(self.profile)
    }

    pub fn project_id(&self) -> CliResult<String> {
        self.conn_mgr.resolve_project(self.profile, self.project)
    }

    /// A poller bound to Ctrl-C, plus the spinner it reports to
    ///
    /// The spinner is only shown for table output so machine-readable
    /// output stays clean.
    pub fn poller(&self, message: String) -> (Poller, ProgressBar) {
        let poller = Poller::new(self.poll.clone()).with_cancellation(self.cancel.clone());
        if self.output.is_table() {
            let pb = progress::spinner(message);
            let poller = poller.on_progress(progress::progress_callback(pb.clone()));
            (poller, pb)
        } else {
            (poller, ProgressBar::hidden())
        }
    }
}

/// Printed instead of the resource when `--no-wait` is given
#[derive(Debug, Serialize)]
pub struct SubmittedOperation {
    pub operation_id: String,
    pub project_id: String,
    pub kind: String,
}

impl From<&OperationHandle> for SubmittedOperation {
    fn from(handle: &OperationHandle) -> Self {
        Self {
            operation_id: handle.operation_id().to_string(),
            project_id: handle.project_id().to_string(),
            kind: handle.kind().to_string(),
        }
    }
}
