//! Configuration and profile management for cloudctl
//!
//! Profiles hold the API endpoint, the access token and an optional default
//! project. The `[polling]` table tunes how long-running operations are
//! awaited.
//!
//! # Features
//!
//! - Multiple named profiles
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

#[allow(clippy::module_inception)]
pub mod config;
pub mod error;
pub mod polling;

// Re-export main types for convenience
pub use config::{ACCESS_TOKEN_ENV, API_URL_ENV, Config, Profile};
pub use error::{ConfigError, Result};
pub use polling::PollConfig;
