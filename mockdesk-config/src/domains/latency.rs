//! Latency model configuration

use crate::error::ConfigResult;
use crate::validation::{validate_fraction, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistical distribution used to draw a base latency from a
/// `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyDistribution {
    /// Linear interpolation across the range
    Uniform,
    /// Mean at the range midpoint, standard deviation range/6, clamped
    /// to the range
    Normal,
    /// Rate chosen so the mean is about range/3, clamped at max
    Exponential,
    /// Sum of two exponential draws with combined mean about range/2,
    /// clamped at max
    Gamma,
}

impl std::fmt::Display for LatencyDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatencyDistribution::Uniform => write!(f, "uniform"),
            LatencyDistribution::Normal => write!(f, "normal"),
            LatencyDistribution::Exponential => write!(f, "exponential"),
            LatencyDistribution::Gamma => write!(f, "gamma"),
        }
    }
}

/// Simulated access-network profile, ordered fastest to slowest.
///
/// Each slower profile has a strictly greater multiplicative factor and
/// additive term than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkProfile {
    Fast,
    Broadband,
    Wifi,
    Mobile4g,
    Mobile3g,
    Slow,
}

impl NetworkProfile {
    /// Multiplicative factor applied to the drawn base latency.
    pub fn multiplier(&self) -> f64 {
        match self {
            NetworkProfile::Fast => 1.0,
            NetworkProfile::Broadband => 1.1,
            NetworkProfile::Wifi => 1.25,
            NetworkProfile::Mobile4g => 1.5,
            NetworkProfile::Mobile3g => 2.5,
            NetworkProfile::Slow => 4.0,
        }
    }

    /// Fixed additive latency for the profile.
    pub fn additive(&self) -> Duration {
        match self {
            NetworkProfile::Fast => Duration::from_millis(0),
            NetworkProfile::Broadband => Duration::from_millis(5),
            NetworkProfile::Wifi => Duration::from_millis(10),
            NetworkProfile::Mobile4g => Duration::from_millis(30),
            NetworkProfile::Mobile3g => Duration::from_millis(100),
            NetworkProfile::Slow => Duration::from_millis(300),
        }
    }
}

/// Coarse geographic distance classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoTier {
    /// Same region, no added distance delay
    Local,
    /// Cross-region, bounded random delay
    Regional,
    /// Cross-continent, larger bounded random delay
    Global,
}

impl GeoTier {
    /// Upper bound of the random distance delay for the tier.
    pub fn max_delay(&self) -> Duration {
        match self {
            GeoTier::Local => Duration::from_millis(0),
            GeoTier::Regional => Duration::from_millis(40),
            GeoTier::Global => Duration::from_millis(150),
        }
    }
}

/// Latency model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Midpoint of the default latency range; the default pattern draws
    /// from `[base/2, base*2]`
    #[serde(with = "humantime_serde", default = "default_base_latency")]
    pub base_latency: Duration,

    /// Symmetric jitter bound as a fraction of the computed latency
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Whether jitter is applied at all
    #[serde(default = "crate::domains::default_true")]
    pub jitter_enabled: bool,

    /// Distribution used for base latency draws
    #[serde(default = "default_distribution")]
    pub distribution: LatencyDistribution,

    /// Simulated access network
    #[serde(default = "default_network_profile")]
    pub network_profile: NetworkProfile,

    /// Simulated geographic distance
    #[serde(default = "default_geo_tier")]
    pub geo_tier: GeoTier,
}

impl LatencyConfig {
    /// Default pattern bounds derived from the base latency.
    pub fn default_range(&self) -> (Duration, Duration) {
        (self.base_latency / 2, self.base_latency * 2)
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            base_latency: default_base_latency(),
            jitter_factor: default_jitter_factor(),
            jitter_enabled: true,
            distribution: default_distribution(),
            network_profile: default_network_profile(),
            geo_tier: default_geo_tier(),
        }
    }
}

impl Validatable for LatencyConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_fraction(self.jitter_factor, "jitter_factor", self.domain_name())?;
        if self.base_latency.is_zero() {
            return Err(self.validation_error("base_latency must be greater than zero"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "latency"
    }
}

fn default_base_latency() -> Duration {
    Duration::from_millis(60)
}

fn default_jitter_factor() -> f64 {
    0.1
}

fn default_distribution() -> LatencyDistribution {
    LatencyDistribution::Uniform
}

fn default_network_profile() -> NetworkProfile {
    NetworkProfile::Broadband
}

fn default_geo_tier() -> GeoTier {
    GeoTier::Local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_strictly_ordered() {
        let order = [
            NetworkProfile::Fast,
            NetworkProfile::Broadband,
            NetworkProfile::Wifi,
            NetworkProfile::Mobile4g,
            NetworkProfile::Mobile3g,
            NetworkProfile::Slow,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].multiplier() < pair[1].multiplier());
            assert!(pair[0].additive() < pair[1].additive());
        }
    }

    #[test]
    fn test_default_range_brackets_base_latency() {
        let config = LatencyConfig::default();
        let (min, max) = config.default_range();
        assert!(min < config.base_latency);
        assert!(max > config.base_latency);
    }

    #[test]
    fn test_jitter_factor_validated_as_fraction() {
        let config = LatencyConfig {
            jitter_factor: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
