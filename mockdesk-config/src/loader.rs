//! Configuration loading

use crate::domains::SimulationConfig;
use crate::error::ConfigResult;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader {
    /// Environment variable naming the config file path
    path_var: String,
}

impl ConfigLoader {
    /// Create a loader reading `MOCKDESK_CONFIG` for the file path.
    pub fn new() -> Self {
        Self {
            path_var: "MOCKDESK_CONFIG".to_string(),
        }
    }

    /// Load configuration from a YAML file and validate all domains.
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SimulationConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_yaml::from_str(&content)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load from the path named by the environment variable, falling
    /// back to validated defaults when it is unset.
    pub fn load(&self) -> ConfigResult<SimulationConfig> {
        match std::env::var(&self.path_var) {
            Ok(path) if !path.is_empty() => self.from_file(path),
            _ => {
                let config = SimulationConfig::default();
                config.validate_all()?;
                Ok(config)
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_parses_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9999\nlatency:\n  base_latency: 20ms\n  distribution: normal\n"
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let config = loader.from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(
            config.latency.base_latency,
            std::time::Duration::from_millis(20)
        );
    }

    #[test]
    fn test_from_file_rejects_invalid_domain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "latency:\n  jitter_factor: 3.0\n").unwrap();

        let loader = ConfigLoader::new();
        assert!(loader.from_file(file.path()).is_err());
    }
}
