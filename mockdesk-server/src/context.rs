//! Shared application context

use mockdesk_config::SimulationConfig;
use mockdesk_core::ResourceStore;
use mockdesk_sim::{FaultInjector, LatencySimulator, RateLimiter, ScenarioManager};
use std::sync::Arc;

use crate::request_log::RequestLog;

/// All dependencies a handler or pipeline stage needs, behind `Arc`
/// handles so the context clones cheaply into axum state.
///
/// Constructed once at startup and passed by handle; there is no
/// package-level shared state, so independent server instances never
/// leak scenarios or statistics into one another.
#[derive(Clone)]
pub struct SimContext {
    pub store: Arc<ResourceStore>,
    pub latency: Arc<LatencySimulator>,
    pub faults: Arc<FaultInjector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub scenarios: Arc<ScenarioManager>,
    pub request_log: Arc<RequestLog>,
    pub config: Arc<SimulationConfig>,
}

impl SimContext {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            store: Arc::new(ResourceStore::new()),
            latency: Arc::new(LatencySimulator::new(config.latency.clone())),
            faults: Arc::new(FaultInjector::new()),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            scenarios: Arc::new(ScenarioManager::new()),
            request_log: Arc::new(RequestLog::new()),
            config: Arc::new(config),
        }
    }
}
