//! Configuration management for IFS Cloud MCP Server.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Main configuration structure.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    /// IFS Cloud base URL (e.g. "https://your-instance.ifs.cloud")
    pub base_url: String,

    /// OAuth2 token endpoint
    pub token_url: String,

    /// OAuth2 client ID
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// OAuth2 scope, sent only when present
    #[serde(default)]
    pub scope: Option<String>,

    /// Company used when a tool call does not name one
    #[serde(default)]
    pub default_company: Option<String>,

    /// Site contract used when a tool call does not name one
    #[serde(default)]
    pub default_site: Option<String>,

    /// Enable debug mode for tool-call tracing
    #[serde(default)]
    pub debug: bool,

    /// HTTP request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Refresh a cached token this long before it expires (seconds)
    #[serde(default = "default_token_buffer")]
    pub token_refresh_buffer_seconds: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_token_buffer() -> u64 {
    60
}

/// Upper bound for `token_refresh_buffer_seconds` (one day).
const MAX_TOKEN_BUFFER_SECS: u64 = 86_400;

/// OAuth2 client-credentials settings.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth2Credentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

impl std::fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Immutable connection settings handed to the request dispatcher.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub credentials: OAuth2Credentials,
    pub token_buffer: chrono::Duration,
    pub default_company: Option<String>,
    pub default_site: Option<String>,
}

impl ConnectionConfig {
    /// Connection with default timeout and refresh buffer.
    pub fn new(base_url: impl Into<String>, credentials: OAuth2Credentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(default_timeout_ms()),
            credentials,
            token_buffer: chrono::Duration::seconds(default_token_buffer() as i64),
            default_company: None,
            default_site: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the `IFS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingField(key.to_string()));

        let timeout_ms = match get("IFS_TIMEOUT") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("IFS_TIMEOUT must be milliseconds, got '{}'", raw))
            })?,
            None => default_timeout_ms(),
        };

        let config = Config {
            base_url: require("IFS_BASE_URL")?,
            token_url: require("IFS_TOKEN_URL")?,
            client_id: require("IFS_CLIENT_ID")?,
            client_secret: require("IFS_CLIENT_SECRET")?,
            scope: get("IFS_SCOPE"),
            default_company: get("IFS_DEFAULT_COMPANY"),
            default_site: get("IFS_DEFAULT_SITE"),
            debug: false,
            timeout_ms,
            token_refresh_buffer_seconds: default_token_buffer(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("base_url", &self.base_url),
            ("token_url", &self.token_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name.into()));
            }
        }

        for (name, url) in [("base_url", &self.base_url), ("token_url", &self.token_url)] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than zero".into()));
        }

        if self.token_refresh_buffer_seconds > MAX_TOKEN_BUFFER_SECS {
            return Err(ConfigError::Invalid(format!(
                "token_refresh_buffer_seconds must be at most {}, got {}",
                MAX_TOKEN_BUFFER_SECS, self.token_refresh_buffer_seconds
            )));
        }

        Ok(())
    }

    /// OAuth2 settings for the token endpoint.
    pub fn credentials(&self) -> OAuth2Credentials {
        OAuth2Credentials {
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: self.scope.clone(),
        }
    }

    /// Derive the immutable connection settings.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(self.timeout_ms),
            credentials: self.credentials(),
            token_buffer: chrono::Duration::seconds(self.token_refresh_buffer_seconds as i64),
            default_company: self.default_company.clone(),
            default_site: self.default_site.clone(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("default_company", &self.default_company)
            .field("default_site", &self.default_site)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}
