//! Server assembly and introspection surface

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use mockdesk_config::SimulationConfig;
use mockdesk_core::{Snapshot, StoreStats};
use mockdesk_sim::faults::ScenarioOccurrences;
use mockdesk_sim::{LatencyStatistics, RateLimitStatistics, ScenarioError};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;

use crate::{context::SimContext, handlers, pipeline, request_log::RequestLogEntry};

/// The simulated backend: context plus router assembly and the
/// introspection surface tests drive.
pub struct SimulationServer {
    context: SimContext,
}

impl SimulationServer {
    /// Build a server from configuration.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            context: SimContext::new(config),
        }
    }

    /// Build a server around an existing context.
    pub fn with_context(context: SimContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    /// Assemble the router. Resource routes sit behind the
    /// interception pipeline; the health probe does not.
    pub fn router(&self) -> Router {
        build_router(self.context.clone())
    }

    // Scenario control

    pub fn active_scenario(&self) -> String {
        self.context.scenarios.get_scenario()
    }

    pub fn set_scenario(&self, name: &str) -> Result<(), ScenarioError> {
        self.context.scenarios.set_scenario(name)
    }

    pub fn available_scenarios(&self) -> Vec<String> {
        self.context.scenarios.available_scenarios()
    }

    // Store checkpointing

    pub fn backup_store(&self) -> Snapshot {
        self.context.store.backup()
    }

    pub fn restore_store(&self, snapshot: &Snapshot) {
        self.context.store.restore(snapshot)
    }

    pub fn store_stats(&self) -> StoreStats {
        self.context.store.stats()
    }

    // Request log introspection

    pub fn request_log(&self) -> Vec<RequestLogEntry> {
        self.context.request_log.entries()
    }

    pub fn clear_request_log(&self) {
        self.context.request_log.clear()
    }

    // Simulation statistics

    pub fn latency_statistics(&self) -> LatencyStatistics {
        self.context.latency.statistics()
    }

    pub fn latency_report(&self) -> String {
        self.context.latency.report()
    }

    pub fn rate_limit_statistics(&self) -> RateLimitStatistics {
        self.context.rate_limiter.statistics()
    }

    pub fn rate_limit_report(&self) -> String {
        self.context.rate_limiter.report()
    }

    pub fn error_occurrences(&self) -> BTreeMap<String, ScenarioOccurrences> {
        self.context.faults.occurrences()
    }
}

/// Create the complete application router.
pub fn build_router(context: SimContext) -> Router {
    let api = Router::new()
        .route(
            "/{locale}/sections/{section_id}/articles.json",
            post(handlers::create_article),
        )
        .route(
            "/{locale}/articles/{id}",
            get(handlers::show_article).put(handlers::update_article),
        )
        .route(
            "/articles/{article_id}/translations.json",
            post(handlers::create_translation),
        )
        .route(
            "/articles/{article_id}/translations/{locale}",
            get(handlers::show_translation).put(handlers::update_translation),
        )
        .layer(middleware::from_fn_with_state(
            context.clone(),
            pipeline::simulation_pipeline,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest(&context.config.server.api_prefix, api)
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}
