//! Token-bucket admission control
//!
//! Three quota dimensions are enforced per request, in order: a burst
//! bucket, a global bucket, then the bucket for the request's endpoint
//! class. Each bucket sits behind its own lock so independent
//! dimensions never contend; limiter-wide statistics live under a
//! separate lock.

use chrono::Utc;
use mockdesk_config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::request::RequestProfile;

/// Trailing window over which the current request rate is derived.
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Token bucket with a hard window reset.
///
/// Within a window, tokens refill continuously at
/// `capacity / window` per second; once the window has fully elapsed
/// the bucket is reset outright: full capacity, fresh window, zeroed
/// in-window request counter.
#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
    window_start: Instant,
    window: Duration,
    requests_in_window: u64,
}

/// Outcome of a single bucket check.
#[derive(Debug, Clone, Copy)]
struct BucketDecision {
    allowed: bool,
    remaining: u32,
    retry_after: Duration,
    window_remaining: Duration,
}

impl TokenBucket {
    fn new(capacity: u32, window: Duration) -> Self {
        let now = Instant::now();
        Self {
            capacity: f64::from(capacity),
            tokens: f64::from(capacity),
            refill_rate: f64::from(capacity) / window.as_secs_f64(),
            last_refill: now,
            window_start: now,
            window,
            requests_in_window: 0,
        }
    }

    /// Roll the window over (hard reset) or refill continuously since
    /// the last check.
    fn refill(&mut self, now: Instant) {
        if now.duration_since(self.window_start) >= self.window {
            self.tokens = self.capacity;
            self.window_start = now;
            self.last_refill = now;
            self.requests_in_window = 0;
        } else {
            let elapsed = now.duration_since(self.last_refill).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
            self.last_refill = now;
        }
    }

    fn check(&mut self) -> BucketDecision {
        let now = Instant::now();
        self.refill(now);
        self.requests_in_window += 1;
        let window_remaining = self.window.saturating_sub(now.duration_since(self.window_start));

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            BucketDecision {
                allowed: true,
                remaining: self.tokens as u32,
                retry_after: Duration::ZERO,
                window_remaining,
            }
        } else {
            let retry_after = if self.refill_rate > 0.0 {
                Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
            } else {
                window_remaining
            };
            BucketDecision {
                allowed: false,
                remaining: 0,
                retry_after,
                window_remaining,
            }
        }
    }

    /// Current remaining tokens and window time without consuming
    /// anything. Used for header values when another bucket already
    /// denied the request.
    fn peek(&mut self) -> (u32, Duration) {
        let now = Instant::now();
        self.refill(now);
        let window_remaining = self.window.saturating_sub(now.duration_since(self.window_start));
        (self.tokens as u32, window_remaining)
    }
}

/// Result of an admission check.
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request may proceed to the handler
    pub allowed: bool,

    /// Which quota denied the request: "burst", "global", or the
    /// endpoint key. `None` when allowed.
    pub limit_type: Option<String>,

    /// Configured global limit, for the limit header
    pub limit: u32,

    /// Whole tokens left in the global bucket
    pub remaining: u32,

    /// Epoch seconds at which the global window rolls over
    pub reset_at: i64,

    /// How long until one token accrues; zero when allowed
    pub retry_after: Duration,
}

impl RateLimitResult {
    /// `Retry-After` value in whole seconds, at least 1 on denial.
    pub fn retry_after_secs(&self) -> u64 {
        if self.allowed {
            return 0;
        }
        (self.retry_after.as_secs_f64().ceil() as u64).max(1)
    }
}

/// Per-endpoint counters within the statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointStatistics {
    pub checks: u64,
    pub denied: u64,
    /// Requests seen in the trailing minute, as of the last check
    pub current_rate_per_minute: usize,
}

/// Point-in-time, deep-copied view of limiter-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitStatistics {
    pub total_checks: u64,
    pub denied_checks: u64,
    pub burst_denials: u64,
    /// Highest trailing-minute request count observed at any check
    pub peak_rate_per_minute: usize,
    pub per_endpoint: BTreeMap<String, EndpointStatistics>,
}

#[derive(Debug, Default)]
struct StatsState {
    total_checks: u64,
    denied_checks: u64,
    burst_denials: u64,
    peak_rate_per_minute: usize,
    recent: Vec<Instant>,
    per_endpoint: BTreeMap<String, EndpointState>,
}

#[derive(Debug, Default)]
struct EndpointState {
    checks: u64,
    denied: u64,
    recent: Vec<Instant>,
}

/// Token-bucket admission controller.
pub struct RateLimiter {
    config: RateLimitConfig,
    started_at: Instant,
    burst: Mutex<TokenBucket>,
    global: Mutex<TokenBucket>,
    endpoints: Vec<(String, Mutex<TokenBucket>)>,
    stats: Mutex<StatsState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let burst = Mutex::new(TokenBucket::new(config.burst_limit, config.burst_window));
        let global = Mutex::new(TokenBucket::new(config.global_limit, config.global_window));
        let endpoints = config
            .endpoint_limits
            .iter()
            .map(|(key, quota)| {
                (
                    key.clone(),
                    Mutex::new(TokenBucket::new(quota.limit, quota.window)),
                )
            })
            .collect();

        Self {
            config,
            started_at: Instant::now(),
            burst,
            global,
            endpoints,
            stats: Mutex::new(StatsState::default()),
        }
    }

    /// Evaluate burst, global, and endpoint quotas in order; the first
    /// bucket to deny short-circuits the rest and determines the
    /// result's limit type. During the startup grace period denials
    /// are suppressed.
    pub fn check_rate_limit(&self, profile: &RequestProfile) -> RateLimitResult {
        let endpoint_key = self.endpoint_key(profile);

        if !self.config.enabled {
            return self.allowed_result();
        }

        let in_grace = self.started_at.elapsed() < self.config.grace_period;

        let burst_decision = self.burst.lock().check();
        if !burst_decision.allowed && !in_grace {
            let (remaining, window_remaining) = self.global.lock().peek();
            self.record_check(None, Some("burst"));
            return self.denied_result(
                profile,
                "burst".to_string(),
                burst_decision.retry_after,
                remaining,
                window_remaining,
            );
        }

        let global_decision = self.global.lock().check();
        if !global_decision.allowed && !in_grace {
            self.record_check(None, Some("global"));
            return self.denied_result(
                profile,
                "global".to_string(),
                global_decision.retry_after,
                global_decision.remaining,
                global_decision.window_remaining,
            );
        }

        if let Some(key) = endpoint_key {
            let decision = self
                .endpoints
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, bucket)| bucket.lock().check());
            if let Some(decision) = decision {
                if !decision.allowed && !in_grace {
                    self.record_check(Some(key.as_str()), Some(key.as_str()));
                    return self.denied_result(
                        profile,
                        key,
                        decision.retry_after,
                        global_decision.remaining,
                        global_decision.window_remaining,
                    );
                }
            }
            self.record_check(Some(key.as_str()), None);
        } else {
            self.record_check(None, None);
        }

        debug!(path = %profile.path, "request admitted");
        RateLimitResult {
            allowed: true,
            limit_type: None,
            limit: self.config.global_limit,
            remaining: global_decision.remaining,
            reset_at: Utc::now().timestamp() + global_decision.window_remaining.as_secs() as i64,
            retry_after: Duration::ZERO,
        }
    }

    fn denied_result(
        &self,
        profile: &RequestProfile,
        limit_type: String,
        retry_after: Duration,
        remaining: u32,
        window_remaining: Duration,
    ) -> RateLimitResult {
        warn!(
            path = %profile.path,
            limit_type = %limit_type,
            ?retry_after,
            "request denied by admission control"
        );
        RateLimitResult {
            allowed: false,
            limit_type: Some(limit_type),
            limit: self.config.global_limit,
            remaining,
            reset_at: Utc::now().timestamp() + window_remaining.as_secs() as i64,
            retry_after,
        }
    }

    /// Standard rate-limit headers for a check result, empty when
    /// headers are disabled in the configuration.
    pub fn limit_headers(&self, result: &RateLimitResult) -> Vec<(&'static str, String)> {
        if !self.config.enable_headers {
            return Vec::new();
        }
        let mut headers = vec![
            ("X-Rate-Limit-Limit", result.limit.to_string()),
            ("X-Rate-Limit-Remaining", result.remaining.to_string()),
            ("X-Rate-Limit-Reset", result.reset_at.to_string()),
        ];
        if let Some(ref limit_type) = result.limit_type {
            headers.push(("X-Rate-Limit-Type", limit_type.clone()));
        }
        headers
    }

    /// Whether denials should be written out as 429 responses.
    pub fn deny_with_429(&self) -> bool {
        self.config.enable_429
    }

    /// Point-in-time copy of the statistics.
    pub fn statistics(&self) -> RateLimitStatistics {
        let stats = self.stats.lock();
        RateLimitStatistics {
            total_checks: stats.total_checks,
            denied_checks: stats.denied_checks,
            burst_denials: stats.burst_denials,
            peak_rate_per_minute: stats.peak_rate_per_minute,
            per_endpoint: stats
                .per_endpoint
                .iter()
                .map(|(key, state)| {
                    (
                        key.clone(),
                        EndpointStatistics {
                            checks: state.checks,
                            denied: state.denied,
                            current_rate_per_minute: state.recent.len(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Zero all counters and rate windows.
    pub fn reset_statistics(&self) {
        *self.stats.lock() = StatsState::default();
    }

    /// Human-readable summary of admission decisions.
    pub fn report(&self) -> String {
        let stats = self.statistics();
        let mut out = String::new();
        out.push_str("Rate limit report\n");
        out.push_str(&format!(
            "  checks: {}  denied: {}  burst denials: {}\n",
            stats.total_checks, stats.denied_checks, stats.burst_denials
        ));
        out.push_str(&format!(
            "  peak rate: {}/min\n",
            stats.peak_rate_per_minute
        ));
        out.push_str("  endpoints:\n");
        for (key, endpoint) in &stats.per_endpoint {
            out.push_str(&format!(
                "    {:<16} checks: {:<8} denied: {:<8} current: {}/min\n",
                key, endpoint.checks, endpoint.denied, endpoint.current_rate_per_minute
            ));
        }
        out
    }

    fn endpoint_key(&self, profile: &RequestProfile) -> Option<String> {
        self.endpoints
            .iter()
            .map(|(key, _)| key)
            .find(|key| profile.path.contains(key.as_str()))
            .cloned()
    }

    fn allowed_result(&self) -> RateLimitResult {
        RateLimitResult {
            allowed: true,
            limit_type: None,
            limit: self.config.global_limit,
            remaining: self.config.global_limit,
            reset_at: Utc::now().timestamp() + self.config.global_window.as_secs() as i64,
            retry_after: Duration::ZERO,
        }
    }

    fn record_check(&self, endpoint: Option<&str>, denied_by: Option<&str>) {
        let now = Instant::now();
        let mut stats = self.stats.lock();

        stats.total_checks += 1;
        stats.recent.push(now);
        let cutoff = now.checked_sub(RATE_WINDOW);
        let within_window = |at: &Instant| cutoff.is_none_or(|c| *at > c);
        stats.recent.retain(within_window);
        stats.peak_rate_per_minute = stats.peak_rate_per_minute.max(stats.recent.len());

        if let Some(limit_type) = denied_by {
            stats.denied_checks += 1;
            if limit_type == "burst" {
                stats.burst_denials += 1;
            }
        }

        if let Some(key) = endpoint {
            let entry = stats.per_endpoint.entry(key.to_string()).or_default();
            entry.checks += 1;
            entry.recent.push(now);
            entry.recent.retain(within_window);
            if denied_by == Some(key) {
                entry.denied += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockdesk_config::EndpointLimit;
    use std::collections::BTreeMap;

    fn config(burst: u32, global: u32) -> RateLimitConfig {
        RateLimitConfig {
            burst_limit: burst,
            burst_window: Duration::from_secs(1),
            global_limit: global,
            global_window: Duration::from_secs(60),
            endpoint_limits: BTreeMap::new(),
            grace_period: Duration::ZERO,
            ..Default::default()
        }
    }

    fn get_articles() -> RequestProfile {
        RequestProfile::new("GET", "/api/v2/help_center/en-us/articles/456.json")
    }

    #[test]
    fn test_fresh_bucket_admits_full_capacity() {
        let mut bucket = TokenBucket::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(bucket.check().allowed);
        }
        assert!(!bucket.check().allowed);
    }

    #[test]
    fn test_window_rollover_hard_resets_bucket() {
        let mut bucket = TokenBucket::new(3, Duration::from_millis(50));
        for _ in 0..3 {
            assert!(bucket.check().allowed);
        }
        assert!(!bucket.check().allowed);

        std::thread::sleep(Duration::from_millis(60));
        // Post-reset: full capacity again
        for _ in 0..3 {
            assert!(bucket.check().allowed);
        }
        assert_eq!(bucket.requests_in_window, 3);
    }

    #[test]
    fn test_empty_bucket_reports_positive_retry_after() {
        let mut bucket = TokenBucket::new(2, Duration::from_secs(60));
        bucket.check();
        bucket.check();

        let decision = bucket.check();
        assert!(!decision.allowed);
        assert!(decision.retry_after > Duration::ZERO);

        // Denial persists until tokens refill
        let again = bucket.check();
        assert!(!again.allowed);
        assert!(again.retry_after > Duration::ZERO);
    }

    #[test]
    fn test_continuous_refill_restores_admission() {
        let mut bucket = TokenBucket::new(10, Duration::from_secs(1));
        for _ in 0..10 {
            bucket.check();
        }
        assert!(!bucket.check().allowed);

        // 10 tokens/sec: 150ms accrues at least one token
        std::thread::sleep(Duration::from_millis(150));
        assert!(bucket.check().allowed);
    }

    #[test]
    fn test_burst_denial_reported_with_type() {
        let limiter = RateLimiter::new(config(2, 1000));

        assert!(limiter.check_rate_limit(&get_articles()).allowed);
        assert!(limiter.check_rate_limit(&get_articles()).allowed);

        let denied = limiter.check_rate_limit(&get_articles());
        assert!(!denied.allowed);
        assert_eq!(denied.limit_type.as_deref(), Some("burst"));
        assert!(denied.retry_after > Duration::ZERO);
        assert!(denied.retry_after_secs() >= 1);
    }

    #[test]
    fn test_global_denial_when_burst_allows() {
        let limiter = RateLimiter::new(config(1000, 3));

        for _ in 0..3 {
            assert!(limiter.check_rate_limit(&get_articles()).allowed);
        }
        let denied = limiter.check_rate_limit(&get_articles());
        assert_eq!(denied.limit_type.as_deref(), Some("global"));
    }

    #[test]
    fn test_endpoint_bucket_denies_with_endpoint_key() {
        let mut cfg = config(1000, 1000);
        cfg.endpoint_limits.insert(
            "articles".to_string(),
            EndpointLimit {
                limit: 2,
                window: Duration::from_secs(60),
            },
        );
        let limiter = RateLimiter::new(cfg);

        assert!(limiter.check_rate_limit(&get_articles()).allowed);
        assert!(limiter.check_rate_limit(&get_articles()).allowed);
        let denied = limiter.check_rate_limit(&get_articles());
        assert_eq!(denied.limit_type.as_deref(), Some("articles"));

        // A path outside the endpoint class is still admitted
        let other = RequestProfile::new("GET", "/api/v2/help_center/sections/1.json");
        assert!(limiter.check_rate_limit(&other).allowed);
    }

    #[test]
    fn test_grace_period_suppresses_denials() {
        let mut cfg = config(1, 1);
        cfg.grace_period = Duration::from_secs(30);
        let limiter = RateLimiter::new(cfg);

        for _ in 0..5 {
            assert!(limiter.check_rate_limit(&get_articles()).allowed);
        }
    }

    #[test]
    fn test_disabled_limiter_admits_everything() {
        let mut cfg = config(1, 1);
        cfg.enabled = false;
        let limiter = RateLimiter::new(cfg);

        for _ in 0..10 {
            assert!(limiter.check_rate_limit(&get_articles()).allowed);
        }
        assert_eq!(limiter.statistics().total_checks, 0);
    }

    #[test]
    fn test_headers_include_limit_type_on_denial() {
        let limiter = RateLimiter::new(config(1, 1000));
        limiter.check_rate_limit(&get_articles());
        let denied = limiter.check_rate_limit(&get_articles());

        let headers = limiter.limit_headers(&denied);
        let names: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"X-Rate-Limit-Limit"));
        assert!(names.contains(&"X-Rate-Limit-Remaining"));
        assert!(names.contains(&"X-Rate-Limit-Reset"));
        assert!(names.contains(&"X-Rate-Limit-Type"));
    }

    #[test]
    fn test_headers_suppressed_when_disabled() {
        let mut cfg = config(10, 10);
        cfg.enable_headers = false;
        let limiter = RateLimiter::new(cfg);
        let result = limiter.check_rate_limit(&get_articles());
        assert!(limiter.limit_headers(&result).is_empty());
    }

    #[test]
    fn test_statistics_idempotent_and_resettable() {
        let limiter = RateLimiter::new(config(1, 1000));
        limiter.check_rate_limit(&get_articles());
        limiter.check_rate_limit(&get_articles());

        assert_eq!(limiter.statistics(), limiter.statistics());

        let stats = limiter.statistics();
        assert_eq!(stats.total_checks, 2);
        assert_eq!(stats.denied_checks, 1);
        assert_eq!(stats.burst_denials, 1);
        assert!(stats.peak_rate_per_minute >= 2);

        limiter.reset_statistics();
        assert_eq!(limiter.statistics(), RateLimitStatistics::default());
    }

    #[test]
    fn test_report_contains_counters() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        limiter.check_rate_limit(&get_articles());
        let report = limiter.report();
        assert!(report.contains("checks: 1"));
        assert!(report.contains("articles"));
    }
}
