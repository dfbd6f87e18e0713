//! Statistical latency model
//!
//! Computes a per-request delay from a configured distribution, network
//! profile, geographic tier, synthetic load, and jitter, then suspends
//! the handling task for that long. The delay is real wall clock, not
//! merely reported, so callers must treat [`LatencySimulator::simulate`]
//! as a slow, blocking operation.

use mockdesk_config::{GeoTier, LatencyConfig, LatencyDistribution};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

use crate::request::RequestProfile;

/// Histogram bucket width in milliseconds.
const HISTOGRAM_BUCKET_MS: u64 = 25;

/// Name recorded for requests served by the fallback pattern.
const DEFAULT_PATTERN: &str = "default";

/// A named latency range for requests matching a method and path
/// fragment.
#[derive(Debug, Clone)]
pub struct LatencyPattern {
    /// Name used in per-pattern statistics
    pub name: String,

    /// Method this pattern applies to; `None` matches any
    pub method: Option<String>,

    /// Substring of the request path; the longest matching fragment is
    /// the most specific
    pub path_fragment: String,

    /// Lower latency bound
    pub min: Duration,

    /// Upper latency bound
    pub max: Duration,

    /// How strongly synthetic load inflates this pattern's latency
    pub load_factor: f64,
}

impl LatencyPattern {
    fn matches(&self, profile: &RequestProfile) -> bool {
        if let Some(ref method) = self.method {
            if !method.eq_ignore_ascii_case(&profile.method) {
                return false;
            }
        }
        profile.path.contains(&self.path_fragment)
    }

    /// Longer fragments are more specific; a method restriction breaks
    /// ties.
    fn specificity(&self) -> usize {
        self.path_fragment.len() * 2 + usize::from(self.method.is_some())
    }
}

/// Running latency statistics.
///
/// Reads are idempotent: two calls to
/// [`LatencySimulator::statistics`] without an intervening request
/// return equal values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStatistics {
    /// Requests measured since the last reset
    pub requests: u64,

    /// Smallest observed delay
    pub min: Option<Duration>,

    /// Largest observed delay
    pub max: Duration,

    /// Sum of all observed delays
    pub total: Duration,

    /// Delay counts bucketed at a fixed millisecond granularity
    pub histogram: BTreeMap<u64, u64>,

    /// Requests served per pattern name
    pub per_pattern: BTreeMap<String, u64>,
}

impl LatencyStatistics {
    /// Mean observed delay, zero before any request.
    pub fn average(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        self.total / self.requests as u32
    }

    fn record(&mut self, pattern: &str, latency: Duration) {
        self.requests += 1;
        self.total += latency;
        self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
        self.max = self.max.max(latency);

        let bucket = (latency.as_millis() as u64 / HISTOGRAM_BUCKET_MS) * HISTOGRAM_BUCKET_MS;
        *self.histogram.entry(bucket).or_insert(0) += 1;
        *self.per_pattern.entry(pattern.to_string()).or_insert(0) += 1;
    }
}

/// Draw a base latency from `[min, max]` under the given distribution.
///
/// Uniform and normal draws stay inside the range; exponential and
/// gamma rise from `min` and are clamped at `max`.
pub fn sample_distribution(
    distribution: LatencyDistribution,
    min: Duration,
    max: Duration,
) -> Duration {
    let min_ms = min.as_secs_f64() * 1000.0;
    let max_ms = max.as_secs_f64() * 1000.0;
    let range = (max_ms - min_ms).max(0.0);

    let drawn_ms = match distribution {
        LatencyDistribution::Uniform => min_ms + fastrand::f64() * range,
        LatencyDistribution::Normal => {
            let mean = (min_ms + max_ms) / 2.0;
            let sd = range / 6.0;
            // Box-Muller transform on two uniform draws
            let u1 = 1.0 - fastrand::f64();
            let u2 = fastrand::f64();
            let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            (mean + z * sd).clamp(min_ms, max_ms)
        }
        LatencyDistribution::Exponential => {
            let mean = range / 3.0;
            let u = 1.0 - fastrand::f64();
            (min_ms + -mean * u.ln()).min(max_ms)
        }
        LatencyDistribution::Gamma => {
            // Sum of two exponential draws, combined mean range/2
            let mean = range / 4.0;
            let u1 = 1.0 - fastrand::f64();
            let u2 = 1.0 - fastrand::f64();
            (min_ms + -mean * u1.ln() + -mean * u2.ln()).min(max_ms)
        }
    };

    Duration::from_secs_f64(drawn_ms.max(0.0) / 1000.0)
}

/// Computes and imposes per-request latency.
pub struct LatencySimulator {
    config: LatencyConfig,
    patterns: RwLock<Vec<LatencyPattern>>,
    stats: Mutex<LatencyStatistics>,
}

impl LatencySimulator {
    pub fn new(config: LatencyConfig) -> Self {
        Self {
            config,
            patterns: RwLock::new(Vec::new()),
            stats: Mutex::new(LatencyStatistics::default()),
        }
    }

    /// Register a custom latency pattern.
    pub fn register_pattern(&self, pattern: LatencyPattern) {
        self.patterns.write().push(pattern);
    }

    /// Compute the delay for a request without sleeping or recording.
    ///
    /// `default_range` overrides the configuration-derived fallback
    /// bounds; a registered pattern that matches the request still
    /// takes precedence. Returns the delay and the name of the pattern
    /// that produced it.
    pub fn compute_latency(
        &self,
        profile: &RequestProfile,
        default_range: Option<(Duration, Duration)>,
    ) -> (Duration, String) {
        let patterns = self.patterns.read();
        let matched = patterns
            .iter()
            .filter(|p| p.matches(profile))
            .max_by_key(|p| p.specificity());

        let (name, min, max, load_factor) = match matched {
            Some(pattern) => (
                pattern.name.clone(),
                pattern.min,
                pattern.max,
                pattern.load_factor,
            ),
            None => {
                let (min, max) = default_range.unwrap_or_else(|| self.config.default_range());
                (DEFAULT_PATTERN.to_string(), min, max, 0.2)
            }
        };
        drop(patterns);

        let mut latency = sample_distribution(self.config.distribution, min, max);

        // Network profile: multiplicative factor plus fixed cost
        let profile_factor = self.config.network_profile.multiplier();
        latency = latency.mul_f64(profile_factor) + self.config.network_profile.additive();

        // Geographic distance: bounded random addition
        let geo_max = self.config.geo_tier.max_delay();
        if self.config.geo_tier != GeoTier::Local && !geo_max.is_zero() {
            latency += geo_max.mul_f64(fastrand::f64());
        }

        // Synthetic load: a randomized utilization scaled by the
        // pattern's sensitivity
        let current_load = fastrand::f64();
        latency = latency.mul_f64(1.0 + current_load * load_factor);

        if self.config.jitter_enabled && self.config.jitter_factor > 0.0 {
            let bound = latency.as_secs_f64() * self.config.jitter_factor;
            let offset = (fastrand::f64() * 2.0 - 1.0) * bound;
            let jittered = latency.as_secs_f64() + offset;
            latency = Duration::from_secs_f64(jittered.max(0.0));
        }

        (latency, name)
    }

    /// Compute the delay, suspend the calling task for that long, and
    /// record the result.
    pub async fn simulate(
        &self,
        profile: &RequestProfile,
        default_range: Option<(Duration, Duration)>,
    ) -> Duration {
        let (latency, pattern) = self.compute_latency(profile, default_range);
        trace!(path = %profile.path, ?latency, pattern = %pattern, "injecting latency");
        tokio::time::sleep(latency).await;
        self.stats.lock().record(&pattern, latency);
        latency
    }

    /// Point-in-time copy of the running statistics.
    pub fn statistics(&self) -> LatencyStatistics {
        self.stats.lock().clone()
    }

    /// Zero all counters.
    pub fn reset_statistics(&self) {
        *self.stats.lock() = LatencyStatistics::default();
    }

    /// Human-readable summary of the recorded delays.
    pub fn report(&self) -> String {
        let stats = self.statistics();
        let mut out = String::new();
        out.push_str("Latency simulation report\n");
        out.push_str(&format!("  requests: {}\n", stats.requests));
        out.push_str(&format!(
            "  min: {:?}  max: {:?}  avg: {:?}\n",
            stats.min.unwrap_or_default(),
            stats.max,
            stats.average()
        ));
        out.push_str("  histogram:\n");
        for (bucket, count) in &stats.histogram {
            out.push_str(&format!(
                "    {:>6}ms..{:<6} {}\n",
                bucket,
                format!("{}ms", bucket + HISTOGRAM_BUCKET_MS),
                count
            ));
        }
        out.push_str("  patterns:\n");
        for (pattern, count) in &stats.per_pattern {
            out.push_str(&format!("    {:<24} {}\n", pattern, count));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockdesk_config::NetworkProfile;

    const EPSILON: Duration = Duration::from_micros(1);

    fn profile() -> RequestProfile {
        RequestProfile::new("GET", "/api/v2/help_center/en-us/articles/456.json")
    }

    #[test]
    fn test_all_distributions_respect_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(90);

        for distribution in [
            LatencyDistribution::Uniform,
            LatencyDistribution::Normal,
            LatencyDistribution::Exponential,
            LatencyDistribution::Gamma,
        ] {
            for _ in 0..1000 {
                let sample = sample_distribution(distribution, min, max);
                assert!(
                    sample + EPSILON >= min,
                    "{} drew {:?} below {:?}",
                    distribution,
                    sample,
                    min
                );
                assert!(
                    sample <= max + EPSILON,
                    "{} drew {:?} above {:?}",
                    distribution,
                    sample,
                    max
                );
            }
        }
    }

    #[test]
    fn test_degenerate_range_collapses_to_point() {
        let value = Duration::from_millis(40);
        let sample = sample_distribution(LatencyDistribution::Uniform, value, value);
        assert_eq!(sample, value);
    }

    #[test]
    fn test_most_specific_pattern_wins() {
        let simulator = LatencySimulator::new(LatencyConfig::default());
        simulator.register_pattern(LatencyPattern {
            name: "articles".to_string(),
            method: None,
            path_fragment: "articles".to_string(),
            min: Duration::from_millis(1),
            max: Duration::from_millis(2),
            load_factor: 0.0,
        });
        simulator.register_pattern(LatencyPattern {
            name: "article-read".to_string(),
            method: Some("GET".to_string()),
            path_fragment: "articles/456".to_string(),
            min: Duration::from_millis(1),
            max: Duration::from_millis(2),
            load_factor: 0.0,
        });

        let (_, pattern) = simulator.compute_latency(&profile(), None);
        assert_eq!(pattern, "article-read");
    }

    #[test]
    fn test_unmatched_request_uses_default_pattern() {
        let simulator = LatencySimulator::new(LatencyConfig::default());
        let (_, pattern) = simulator.compute_latency(&profile(), None);
        assert_eq!(pattern, "default");
    }

    #[test]
    fn test_slower_profile_never_beats_faster_floor() {
        // With jitter and load off, the slow profile's additive term
        // alone exceeds the fast profile's maximum possible draw for a
        // narrow range.
        let range = (Duration::from_millis(1), Duration::from_millis(2));
        let fast = LatencySimulator::new(LatencyConfig {
            network_profile: NetworkProfile::Fast,
            jitter_enabled: false,
            ..Default::default()
        });
        let slow = LatencySimulator::new(LatencyConfig {
            network_profile: NetworkProfile::Slow,
            jitter_enabled: false,
            ..Default::default()
        });

        for _ in 0..100 {
            let (fast_latency, _) = fast.compute_latency(&profile(), Some(range));
            let (slow_latency, _) = slow.compute_latency(&profile(), Some(range));
            assert!(slow_latency > fast_latency);
        }
    }

    #[tokio::test]
    async fn test_simulate_sleeps_and_records() {
        let simulator = LatencySimulator::new(LatencyConfig {
            base_latency: Duration::from_millis(10),
            jitter_enabled: false,
            ..Default::default()
        });

        let range = (Duration::from_millis(5), Duration::from_millis(10));
        let started = std::time::Instant::now();
        let reported = simulator.simulate(&profile(), Some(range)).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= reported - Duration::from_millis(1));

        let stats = simulator.statistics();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.per_pattern.get("default"), Some(&1));
        assert!(stats.min.is_some());
    }

    #[test]
    fn test_statistics_idempotent_and_resettable() {
        let simulator = LatencySimulator::new(LatencyConfig::default());
        assert_eq!(simulator.statistics(), simulator.statistics());

        simulator.stats.lock().record("default", Duration::from_millis(30));
        assert_eq!(simulator.statistics(), simulator.statistics());

        simulator.reset_statistics();
        assert_eq!(simulator.statistics(), LatencyStatistics::default());
    }

    #[test]
    fn test_report_mentions_patterns() {
        let simulator = LatencySimulator::new(LatencyConfig::default());
        simulator.stats.lock().record("default", Duration::from_millis(30));
        let report = simulator.report();
        assert!(report.contains("requests: 1"));
        assert!(report.contains("default"));
    }
}
