//! Connection management: building an API client and picking a project

use std::path::PathBuf;
use std::time::Duration;

use cloudctl_core::config::{ACCESS_TOKEN_ENV, API_URL_ENV};
use cloudctl_core::{ApiClient, Config, ConfigError, PollConfig};
use tracing::{debug, info, trace};

use crate::error::Result as CliResult;

/// User agent string for cloudctl HTTP requests
const CLOUDCTL_USER_AGENT: &str = concat!("cloudctl/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout; operation waits are bounded separately
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default API endpoint when only an access token is provided via environment
const DEFAULT_API_URL: &str = "https://api.cloud.example/v1alpha5";

/// Connection manager for creating authenticated clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

/// Endpoint and credentials after applying profile and environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    api_url: String,
    access_token: String,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// When --config-file is given, environment variables are ignored so the
    /// file is the only source of credentials.
    fn use_env_vars(&self) -> bool {
        self.config_path.is_none()
    }

    fn credentials(&self, profile_name: Option<&str>) -> CliResult<Credentials> {
        let use_env_vars = self.use_env_vars();
        if !use_env_vars {
            info!("--config-file specified explicitly, ignoring environment variables");
        }

        let env_token = use_env_vars
            .then(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .flatten();
        let env_url = use_env_vars
            .then(|| std::env::var(API_URL_ENV).ok())
            .flatten();

        // A token from the environment is enough on its own when no profile exists
        if self.config.profiles.is_empty()
            && profile_name.is_none()
            && let Some(token) = env_token.clone()
        {
            info!("Using credentials from environment variables");
            return Ok(Credentials {
                api_url: env_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                access_token: token,
            });
        }

        let (name, profile) = self.config.profile(profile_name)?;
        info!("Using profile: {}", name);
        if env_token.is_some() || env_url.is_some() {
            debug!("Applying environment variable overrides to profile '{}'", name);
        }

        Ok(Credentials {
            api_url: env_url.unwrap_or_else(|| profile.api_url.clone()),
            access_token: env_token.unwrap_or_else(|| profile.access_token.clone()),
        })
    }

    /// Create an API client for the resolved profile
    pub fn create_client(&self, profile_name: Option<&str>) -> CliResult<ApiClient> {
        let credentials = self.credentials(profile_name)?;
        info!("Connecting to API: {}", credentials.api_url);
        trace!(
            "Access token: {}...",
            credentials.access_token.chars().take(4).collect::<String>()
        );

        let http = reqwest_client()?;
        let client = ApiClient::with_http_client(http, &credentials.api_url, credentials.access_token)?;
        debug!("API client created successfully");
        Ok(client)
    }

    /// Project for a command: `--project` wins, then the profile's
    /// `default_project`.
    pub fn resolve_project(
        &self,
        profile_name: Option<&str>,
        explicit_project: Option<&str>,
    ) -> CliResult<String> {
        if let Some(project) = explicit_project {
            return Ok(project.to_string());
        }
        if self.config.profiles.is_empty() && profile_name.is_none() {
            return Err(ConfigError::NoProject {
                profile: "(environment)".to_string(),
            }
            .into());
        }
        let project = self.config.resolve_project(profile_name, None)?;
        debug!("Using default project {} from profile", project);
        Ok(project)
    }

    /// Polling settings from the config file with command-line overrides
    pub fn poll_config(&self, timeout_secs: Option<u64>, interval_secs: Option<u64>) -> PollConfig {
        self.config
            .polling
            .clone()
            .with_overrides(timeout_secs, interval_secs)
    }
}

fn reqwest_client() -> CliResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(CLOUDCTL_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| cloudctl_core::ApiError::Request(e).into())
}
