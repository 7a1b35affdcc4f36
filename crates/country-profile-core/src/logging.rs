//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! # Log Levels
//!
//! - `warn`: degraded scope lookups, suspicious configuration
//! - `info`: one line per assembled profile
//! - `debug`: query groups issued, merged map sizes, superseded builds
//! - `trace`: unparsable numeric cells
//!
//! `RUST_LOG` overrides the configured level when set.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// JSON lines for log collectors.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Include the module path of each event.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Parse a level name such as `"debug"`.
    pub fn from_level_str(level: &str) -> Result<Self, LoggingError> {
        let level = Level::from_str(level.trim())
            .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;
        Ok(Self {
            level,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_target(mut self, enable: bool) -> Self {
        self.with_target = enable;
        self
    }
}

/// Install the global subscriber. Fails instead of panicking when one is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = build_env_filter(config.level);

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn
        EnvFilter::new(format!(
            "warn,country_profile_core={level},country_profile_remote={level}",
            level = level.as_str().to_lowercase()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_level_str() {
        assert_eq!(LogConfig::from_level_str("debug").unwrap().level, Level::DEBUG);
        assert_eq!(LogConfig::from_level_str(" WARN ").unwrap().level, Level::WARN);
        assert!(matches!(
            LogConfig::from_level_str("loud"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_second_init_fails_without_panicking() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
