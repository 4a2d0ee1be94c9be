//! Submit-and-wait workflows
//!
//! These compose [`ApiClient`](crate::api::ApiClient) calls with a
//! [`Poller`](crate::operation::Poller). For single calls that do not need
//! to wait, use the client directly.

pub mod disk;
pub mod instance;
pub mod params;

pub use disk::*;
pub use instance::*;
pub use params::*;
