//! Configuration management for cloudctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::polling::PollConfig;

/// Environment variable that overrides a profile's access token; read by the CLI
pub const ACCESS_TOKEN_ENV: &str = "CLOUDCTL_ACCESS_TOKEN";

/// Environment variable that overrides a profile's API URL
pub const API_URL_ENV: &str = "CLOUDCTL_API_URL";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, rename = "default_profile")]
    pub default_profile: Option<String>,
    /// Operation polling settings
    #[serde(default)]
    pub polling: PollConfig,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Base URL of the cloud API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token sent with every request
    pub access_token: String,
    /// Project used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

impl Config {
    /// Resolve the profile name to use.
    ///
    /// Order: explicit name, then `default_profile`, then the alphabetically
    /// first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        let mut names: Vec<_> = self.profiles.keys().collect();
        names.sort();
        names
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: format!(
                    "Create one in {} or set {}.",
                    Self::config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| "the config file".to_string()),
                    ACCESS_TOKEN_ENV
                ),
            })
    }

    /// Look up a resolved profile by name
    pub fn profile(&self, explicit_profile: Option<&str>) -> Result<(String, &Profile)> {
        let name = self.resolve_profile(explicit_profile)?;
        let profile = self
            .profiles
            .get(&name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.clone() })?;
        Ok((name, profile))
    }

    /// Pick the project for a command: an explicit id wins, otherwise the
    /// profile's `default_project`.
    pub fn resolve_project(
        &self,
        explicit_profile: Option<&str>,
        explicit_project: Option<&str>,
    ) -> Result<String> {
        if let Some(project) = explicit_project {
            return Ok(project.to_string());
        }
        let (name, profile) = self.profile(explicit_profile)?;
        profile
            .default_project
            .clone()
            .ok_or(ConfigError::NoProject { profile: name })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        // Expand environment variables in the config content
        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Get the path to the configuration file
    ///
    /// On Linux: ~/.config/cloudctl/config.toml
    /// On macOS: ~/Library/Application Support/dev.cloudctl.cloudctl/config.toml
    /// On Windows: %APPDATA%\cloudctl\cloudctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("dev", "cloudctl", "cloudctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default} syntax.
    ///
    /// Example:
    /// ```toml
    /// access_token = "${CLOUD_TOKEN}"
    /// api_url = "${CLOUD_API_URL:-https://api.cloud.example/v1alpha5}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        // Unset variables stay as-is so profiles that are not used don't fail to load
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

fn default_api_url() -> String {
    "https://api.cloud.example/v1alpha5".to_string()
}
