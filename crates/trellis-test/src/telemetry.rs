//! Logging setup for tests and demos.

use std::env;

use tracing_subscriber::EnvFilter;

/// Log output configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full `EnvFilter` string)
    pub level: String,

    /// Whether to print the event target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TRELLIS_LOG` or `RUST_LOG`: filter directive (default: info)
    /// - `TRELLIS_LOG_TARGET`: print targets (default: false)
    pub fn from_env() -> Self {
        Self {
            level: env::var("TRELLIS_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            with_target: env::var("TRELLIS_LOG_TARGET")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install a global fmt subscriber writing to the test output.
///
/// Returns false when a subscriber is already installed, so every test may
/// call it.
pub fn init_logging(config: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.with_target)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.with_target);
    }

    #[test]
    fn test_with_level_overrides() {
        let config = LogConfig::default().with_level("trellis_reactive=trace");
        assert_eq!(config.level, "trellis_reactive=trace");
    }

    #[test]
    fn test_init_logging_idempotent() {
        let config = LogConfig::default().with_level("debug");
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
