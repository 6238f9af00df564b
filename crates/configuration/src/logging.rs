use crate::error::ConfigError;
use crate::settings::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// Logs go to stderr so that stdout stays free for simulation output. When a
/// log directory is configured, a daily rolling file is written as well; the
/// returned guard must be held for as long as that file should be flushed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            ConfigError::LoggingError(format!("invalid log filter '{}': {}", config.level, e))
        })?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "vault-sim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let result = match config.format {
        LogFormat::Full => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}
