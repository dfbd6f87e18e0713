//! Admission control configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Quota for a single endpoint class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLimit {
    /// Requests admitted per window
    pub limit: u32,

    /// Window duration
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

/// Admission control configuration.
///
/// The global and burst quotas apply to every request; endpoint quotas
/// apply to requests whose path contains the endpoint key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether admission control runs at all
    #[serde(default = "crate::domains::default_true")]
    pub enabled: bool,

    /// Requests admitted per global window
    #[serde(default = "default_global_limit")]
    pub global_limit: u32,

    /// Global window duration
    #[serde(with = "humantime_serde", default = "default_global_window")]
    pub global_window: Duration,

    /// Requests admitted per burst window
    #[serde(default = "default_burst_limit")]
    pub burst_limit: u32,

    /// Burst window duration
    #[serde(with = "humantime_serde", default = "default_burst_window")]
    pub burst_window: Duration,

    /// Per-endpoint quotas keyed by path fragment
    #[serde(default = "default_endpoint_limits")]
    pub endpoint_limits: BTreeMap<String, EndpointLimit>,

    /// Whether denials are written out as 429 responses
    #[serde(default = "crate::domains::default_true")]
    pub enable_429: bool,

    /// Whether `X-Rate-Limit-*` headers are attached
    #[serde(default = "crate::domains::default_true")]
    pub enable_headers: bool,

    /// Time after startup during which denials are suppressed
    #[serde(with = "humantime_serde", default = "default_grace_period")]
    pub grace_period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global_limit: default_global_limit(),
            global_window: default_global_window(),
            burst_limit: default_burst_limit(),
            burst_window: default_burst_window(),
            endpoint_limits: default_endpoint_limits(),
            enable_429: true,
            enable_headers: true,
            grace_period: default_grace_period(),
        }
    }
}

impl RateLimitConfig {
    /// A configuration that admits everything; useful in tests that
    /// exercise other pipeline stages.
    pub fn permissive() -> Self {
        Self {
            global_limit: 100_000,
            burst_limit: 10_000,
            endpoint_limits: BTreeMap::new(),
            ..Default::default()
        }
    }
}

impl Validatable for RateLimitConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        validate_positive(self.global_limit, "global_limit", self.domain_name())?;
        validate_positive(self.burst_limit, "burst_limit", self.domain_name())?;
        validate_positive(
            self.global_window.as_millis(),
            "global_window",
            self.domain_name(),
        )?;
        validate_positive(
            self.burst_window.as_millis(),
            "burst_window",
            self.domain_name(),
        )?;

        for (key, endpoint) in &self.endpoint_limits {
            if key.is_empty() {
                return Err(self.validation_error("endpoint key cannot be empty"));
            }
            validate_positive(endpoint.limit, "endpoint limit", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "rate_limit"
    }
}

fn default_global_limit() -> u32 {
    200
}

fn default_global_window() -> Duration {
    Duration::from_secs(60)
}

fn default_burst_limit() -> u32 {
    20
}

fn default_burst_window() -> Duration {
    Duration::from_secs(1)
}

fn default_grace_period() -> Duration {
    Duration::from_secs(0)
}

fn default_endpoint_limits() -> BTreeMap<String, EndpointLimit> {
    let mut limits = BTreeMap::new();
    limits.insert(
        "articles".to_string(),
        EndpointLimit {
            limit: 120,
            window: Duration::from_secs(60),
        },
    );
    limits.insert(
        "translations".to_string(),
        EndpointLimit {
            limit: 60,
            window: Duration::from_secs(60),
        },
    );
    limits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RateLimitConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected_when_enabled() {
        let config = RateLimitConfig {
            global_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let disabled = RateLimitConfig {
            enabled: false,
            global_limit: 0,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_duration_fields_accept_humantime() {
        let yaml = "global_window: 30s\nburst_window: 500ms\n";
        let config: RateLimitConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.global_window, Duration::from_secs(30));
        assert_eq!(config.burst_window, Duration::from_millis(500));
    }
}
