//! # cloudctl-core
//!
//! Shared engine for `cloudctl`: an API client for disks and VM instances,
//! the long-running operation poller every mutation goes through, and the
//! reconciler that converges a VM's disk attachments on a desired set.
//!
//! ## Layers
//!
//! - [`api`] - HTTP client and wire models. Every mutation returns an
//!   [`OperationHandle`].
//! - [`operation`] - drives a handle to a terminal state with a bounded
//!   wait, then decodes the produced resource with [`resolve`].
//! - [`attachment`] and [`reconcile`] - diff observed against desired
//!   attachments and apply the difference, detaches first.
//! - [`workflows`] - "submit and wait" compositions of the above.
//! - [`config`] - profiles and polling defaults from `config.toml`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cloudctl_core::{ApiClient, PollConfig, Poller};
//! use cloudctl_core::attachment::{AttachmentMode, AttachmentRecord};
//! use cloudctl_core::workflows::update_instance_disks_and_wait;
//!
//! let client = ApiClient::new("https://api.cloud.example/v1alpha5", token)?;
//! let poller = Poller::new(PollConfig::default());
//! let desired = vec![AttachmentRecord::data("disk-1", AttachmentMode::ReadOnly)];
//!
//! let outcome =
//!     update_instance_disks_and_wait(&client, &poller, "proj-1", "vm-1", &desired).await?;
//! println!("{} attached, {} detached", outcome.attached.len(), outcome.detached.len());
//! ```

pub mod api;
pub mod attachment;
pub mod config;
pub mod error;
pub mod operation;
pub mod progress;
pub mod reconcile;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod workflows;

pub use api::{ApiClient, ApiError};
pub use config::{Config, ConfigError, PollConfig, Profile};
pub use error::{CoreError, Result};
pub use operation::{
    Operation, OperationHandle, OperationKind, OperationState, Poller, StatusFetcher,
    await_and_resolve, resolve,
};
pub use progress::{ProgressCallback, ProgressEvent};
pub use reconcile::{AttachmentSubmitter, Mutation, ReconcileOutcome, Reconciler};
