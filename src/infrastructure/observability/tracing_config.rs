use crate::presentation::config::{Environment, LoggingSettings};

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
}

impl TracingConfig {
    pub fn from_settings(environment: Environment, logging: &LoggingSettings) -> Self {
        Self {
            environment: environment.to_string(),
            json_format: logging.enable_json,
            level: logging.level.clone(),
        }
    }

    pub fn filter_directive(&self) -> String {
        format!("{},unmixer=debug,tower_http=debug", self.level)
    }
}
