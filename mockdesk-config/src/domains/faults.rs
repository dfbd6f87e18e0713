//! Fault injection configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Fault injection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Behavior set active at startup
    #[serde(default = "default_active_scenario")]
    pub active_scenario: String,

    /// Shared fault scenarios evaluated for every request, independent
    /// of the active behavior set. Empty means the shared injector is
    /// effectively off.
    #[serde(default)]
    pub enabled_scenarios: Vec<String>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            active_scenario: default_active_scenario(),
            enabled_scenarios: Vec::new(),
        }
    }
}

impl Validatable for FaultConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(
            &self.active_scenario,
            "active_scenario",
            self.domain_name(),
        )?;
        for name in &self.enabled_scenarios {
            validate_required_string(name, "enabled_scenarios entry", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "faults"
    }
}

fn default_active_scenario() -> String {
    "baseline".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FaultConfig::default();
        assert_eq!(config.active_scenario, "baseline");
        assert!(config.enabled_scenarios.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_scenario_name_rejected() {
        let config = FaultConfig {
            active_scenario: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
