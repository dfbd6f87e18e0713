//! Logging configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit compact single-line output instead of the full format
    #[serde(default = "crate::domains::default_false")]
    pub compact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            compact: false,
        }
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&self.level.as_str()) {
            return Err(self.validation_error(format!(
                "level must be one of {}, got '{}'",
                valid.join(", "),
                self.level
            )));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "logging"
    }
}

fn default_level() -> String {
    "info".to_string()
}
