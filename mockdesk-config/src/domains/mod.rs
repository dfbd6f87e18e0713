//! Domain-specific configuration modules

pub mod faults;
pub mod latency;
pub mod logging;
pub mod rate_limit;
pub mod server;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main mockdesk configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: server::ServerConfig,

    /// Latency model configuration
    #[serde(default)]
    pub latency: latency::LatencyConfig,

    /// Admission control configuration
    #[serde(default)]
    pub rate_limit: rate_limit::RateLimitConfig,

    /// Fault injection configuration
    #[serde(default)]
    pub faults: faults::FaultConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl SimulationConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.latency.validate()?;
        self.rate_limit.validate()?;
        self.faults.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SimulationConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}

/// Default functions for serde
pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}
