//! Error types for cloudctl
//!
//! Core errors keep their classification all the way to the terminal so the
//! user can tell a timeout apart from a failed operation or a partial
//! reconcile.

use cloudctl_core::{ConfigError, CoreError, Mutation};
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Reconcile stopped at 'attach d-2 (read-write)' after 1 applied mutation(s)
///   applied: detach d-1 (read-write)
///
///   tip: Nothing was rolled back; re-run the same command to converge from the current state
/// ```
pub struct CliDiagnostic {
    message: String,
    details: Vec<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            details: Vec::new(),
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.details.push(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Render the diagnostic with colored formatting.
    pub fn render(&self) -> String {
        let mut out = format!("{}{}{}\n", "error".red().bold(), ": ".bold(), self.message);

        for detail in &self.details {
            out.push_str(&format!("  {}\n", detail));
        }

        for (description, commands) in &self.tips {
            out.push('\n');
            out.push_str(&format!("  {}{}{}\n", "tip".yellow().bold(), ": ".bold(), description));
            for cmd in commands {
                out.push_str(&format!("      {}\n", cmd));
            }
        }
        out
    }

    /// Print the diagnostic to stderr.
    pub fn print(&self) {
        eprint!("{}", self.render());
    }
}

/// Main error type for the cloudctl application
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Disk '{disk_id}' not found in project {project_id}")]
    DiskNotFound { disk_id: String, project_id: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for cloudctl operations
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Exit status for this error
    ///
    /// 2 for invalid input or configuration, 3 when the wait ran out while
    /// the operation may still complete, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InvalidInput { .. } => 2,
            CliError::Core(err) if err.is_invalid_input() => 2,
            CliError::Core(err) if err.is_timeout() => 3,
            _ => 1,
        }
    }

    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::Config(ConfigError::NoProfiles { .. }) => vec![
                "Add a [profiles.<name>] table with an access_token to the config file".to_string(),
                "Or set CLOUDCTL_ACCESS_TOKEN for a one-off command".to_string(),
            ],
            CliError::Config(ConfigError::NoProject { profile }) => vec![
                "Pass --project <id>".to_string(),
                format!("Or set default_project in profile '{}'", profile),
            ],
            CliError::Config(ConfigError::ProfileNotFound { name }) => vec![
                format!("Check the spelling of profile '{}'", name),
                "Profiles are read from the config file; see --config-file".to_string(),
            ],
            CliError::Core(CoreError::Timeout { operation_id, .. }) => vec![
                "The operation may still finish server-side".to_string(),
                format!(
                    "Keep waiting: cloudctl operation wait {} --kind <disk|instance>",
                    operation_id
                ),
            ],
            CliError::Core(CoreError::Cancelled { operation_id }) => vec![format!(
                "The operation was not cancelled server-side; check it with: cloudctl operation wait {} --kind <disk|instance>",
                operation_id
            )],
            CliError::Core(CoreError::InvalidDesired { disk_id }) => vec![format!(
                "Pass --disk {} once, with the mode it should be attached in",
                disk_id
            )],
            CliError::Core(CoreError::PartialReconcile { .. }) => vec![
                "Nothing was rolled back; re-run the same command to converge from the current state"
                    .to_string(),
            ],
            CliError::Core(err) if err.is_not_found() => vec![
                "Verify the resource ID is correct".to_string(),
                "Check that you're using the correct project and profile".to_string(),
            ],
            CliError::Core(err) if err.is_retryable() => {
                vec!["This looks temporary; retrying the command may succeed".to_string()]
            }
            CliError::DiskNotFound { .. } => {
                vec!["The disk may have been deleted outside of cloudctl".to_string()]
            }
            _ => vec![],
        }
    }

    pub fn diagnostic(&self) -> CliDiagnostic {
        let mut diag = CliDiagnostic::error(&self.to_string());

        let applied: &[Mutation] = match self {
            CliError::Core(err) => err.applied_mutations(),
            _ => &[],
        };
        for mutation in applied {
            diag = diag.detail(&format!("applied: {}", mutation));
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }
        diag
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        self.diagnostic().print();
    }
}

impl From<cloudctl_core::ApiError> for CliError {
    fn from(err: cloudctl_core::ApiError) -> Self {
        CliError::Core(CoreError::Transport(err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::OutputError {
            message: err.to_string(),
        }
    }
}
