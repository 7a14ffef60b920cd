//! Client configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `STOREFRONT_`; nested keys use `__` (e.g. `STOREFRONT_SESSION__FILE`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::guard::GuardPaths;

/// Configuration for talking to the storefront backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API (e.g. "https://shop.example.com/api").
    /// Only commands that talk to the backend need it.
    #[serde(default)]
    api_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    request_timeout_seconds: u64,
    /// Session persistence.
    #[serde(default)]
    session: SessionConfig,
    /// Redirect targets used by the route guards.
    #[serde(default)]
    guards: GuardPaths,
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where the session file lives. Defaults to the platform data directory.
    #[serde(default)]
    file: Option<PathBuf>,
    /// Whether an `exp` claim in the past ends the session.
    #[serde(default = "default_enforce_expiry")]
    enforce_expiry: bool,
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_enforce_expiry() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: None,
            enforce_expiry: default_enforce_expiry(),
        }
    }
}

impl SessionConfig {
    /// Returns the session file path, falling back to
    /// `<data dir>/storefront/session.json`.
    #[must_use]
    pub fn file(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storefront")
                .join("session.json")
        })
    }

    #[must_use]
    pub fn enforce_expiry(&self) -> bool {
        self.enforce_expiry
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout_seconds: default_request_timeout_seconds(),
            session: SessionConfig::default(),
            guards: GuardPaths::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// `api_url`, when given, overrides `STOREFRONT_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its field.
    pub fn from_env(api_url: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().add_source(
            config::Environment::with_prefix("STOREFRONT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        if let Some(url) = api_url {
            builder = builder.set_override("api_url", url)?;
        }
        builder.build()?.try_deserialize()
    }

    /// Returns the API base URL, or an error when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is empty.
    pub fn require_api_url(&self) -> Result<&str, config::ConfigError> {
        let url = self.api_url();
        if url.is_empty() {
            return Err(config::ConfigError::NotFound("api_url".to_string()));
        }
        Ok(url)
    }

    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    #[must_use]
    pub fn guards(&self) -> &GuardPaths {
        &self.guards
    }

    /// Sets the session file path.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session.file = Some(path.into());
        self
    }
}
