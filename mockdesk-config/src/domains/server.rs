//! HTTP server configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix all resource routes are nested under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Whether completed requests are appended to the in-memory log
    #[serde(default = "crate::domains::default_true")]
    pub capture_request_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            capture_request_log: true,
        }
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.bind_address, "bind_address", self.domain_name())?;
        validate_positive(self.port, "port", self.domain_name())?;

        if !self.api_prefix.starts_with('/') {
            return Err(self.validation_error("api_prefix must start with '/'"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "server"
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_api_prefix() -> String {
    "/api/v2/help_center".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8090);
        assert!(config.api_prefix.starts_with('/'));
    }

    #[test]
    fn test_api_prefix_must_be_rooted() {
        let config = ServerConfig {
            api_prefix: "api/v2".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
