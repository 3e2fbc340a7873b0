use serde::{Deserialize, Serialize};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DataVersionError, Result};

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per record
    Json,
    /// Human readable lines
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `data_version=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Keeps the installed subscriber active until dropped
pub struct Logging {
    _guard: DefaultGuard,
}

impl Logging {
    /// Install a subscriber writing to stderr for the current thread.
    ///
    /// Records carry file, line and target. An unparseable level falls back to
    /// `info`.
    pub fn install(config: &LoggingConfig) -> Result<Logging> {
        let filter = match EnvFilter::try_new(&config.level) {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new("info")
                .map_err(|e| DataVersionError::config(format!("Invalid log filter: {}", e)))?,
        };

        let json_layer = (config.format == LogFormat::Json).then(|| {
            fmt::layer()
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_writer(std::io::stderr)
        });
        let pretty_layer = (config.format == LogFormat::Pretty).then(|| {
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_writer(std::io::stderr)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(pretty_layer);

        Ok(Logging {
            _guard: tracing::subscriber::set_default(subscriber),
        })
    }
}
