use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{LogFormat, LoggingConfig, VaultConfig};

/// Loads the client configuration from an optional `config.toml` in the working
/// directory, overlaid with `VAULT_*` environment variables.
///
/// The result is validated before it is returned, so a missing URL or token
/// surfaces here rather than on the first call.
pub fn load_config() -> Result<VaultConfig, ConfigError> {
    build(config::File::with_name("config").required(false), environment())
}

/// Same as [`load_config`], but reads settings from an explicit file, which must exist.
pub fn load_config_from(path: &Path) -> Result<VaultConfig, ConfigError> {
    build(config::File::from(path).required(true), environment())
}

// VAULT_CORE_API_URL, VAULT_AUTH_TOKEN, VAULT_LOGGING__LEVEL, ...
// Values stay strings; typed fields such as `timeout_secs` are converted on
// deserialization, so a numeric-looking token keeps its exact spelling.
fn environment() -> config::Environment {
    config::Environment::with_prefix("VAULT")
        .prefix_separator("_")
        .separator("__")
}

fn build<S>(file: S, env: config::Environment) -> Result<VaultConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?;

    let config = builder.try_deserialize::<VaultConfig>()?;
    config.validate()?;

    tracing::debug!(core_api_url = %config.core_api_url, "Configuration loaded.");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// The `VAULT_*` source fed from `vars` instead of the process environment.
    fn env_from(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    fn load(path: &Path, vars: &[(&str, &str)]) -> Result<VaultConfig, ConfigError> {
        build(config::File::from(path).required(true), env_from(vars))
    }

    #[test]
    fn loads_and_validates_a_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
core_api_url = "https://core-api.example.com/"
auth_token = "abc"
timeout_secs = 30

[logging]
level = "debug"
format = "compact"
"#
        )
        .unwrap();

        let config = load(file.path(), &[]).unwrap();
        assert_eq!(config.core_api_url, "https://core-api.example.com/");
        assert_eq!(config.auth_token, "abc");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.contract_path.is_none());
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = load(file.path(), &[]).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn environment_overrides_file_and_keeps_numeric_token_verbatim() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"core_api_url = "https://file.example.com""#).unwrap();

        let config = load(
            file.path(),
            &[
                ("VAULT_CORE_API_URL", "https://env.example.com"),
                ("VAULT_AUTH_TOKEN", "000123"),
                ("VAULT_TIMEOUT_SECS", "30"),
                ("VAULT_LOGGING__LEVEL", "debug"),
            ],
        )
        .unwrap();
        assert_eq!(config.core_api_url, "https://env.example.com");
        assert_eq!(config.auth_token, "000123");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn exponent_shaped_token_is_not_reparsed() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let config = load(
            file.path(),
            &[
                ("VAULT_CORE_API_URL", "https://env.example.com"),
                ("VAULT_AUTH_TOKEN", "1e10"),
            ],
        )
        .unwrap();
        assert_eq!(config.auth_token, "1e10");
    }
}
