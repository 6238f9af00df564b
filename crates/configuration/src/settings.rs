use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the simulation client.
///
/// `core_api_url` and `auth_token` have no usable defaults: they are supplied by
/// whoever administers the service, and [`VaultConfig::validate`] refuses to
/// hand out a configuration where either is missing.
#[derive(Clone, Deserialize)]
pub struct VaultConfig {
    /// Base URL of the core API, e.g. `https://core-api.example.com`.
    #[serde(default)]
    pub core_api_url: String,
    /// Token sent in the `X-Auth-Token` header of every call.
    #[serde(default)]
    pub auth_token: String,
    /// Advisory timeout sent to the server with each call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Contract source used by the scenario suite.
    #[serde(default)]
    pub contract_path: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_timeout_secs() -> u64 {
    10
}

impl VaultConfig {
    pub fn new(core_api_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            core_api_url: core_api_url.into(),
            auth_token: auth_token.into(),
            timeout_secs: default_timeout_secs(),
            contract_path: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks that the required settings are present and well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "core_api_url must be set (VAULT_CORE_API_URL)".to_string(),
            ));
        }
        if self.auth_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth_token must be set (VAULT_AUTH_TOKEN)".to_string(),
            ));
        }
        let url = url::Url::parse(&self.core_api_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "core_api_url '{}' is not a valid URL: {}",
                self.core_api_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "core_api_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// The token is a credential; keep it out of logs and panic messages.
impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("core_api_url", &self.core_api_url)
            .field("auth_token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("contract_path", &self.contract_path)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Controls the tracing subscriber installed by [`crate::logging::init_tracing`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}
