//! Simulation engine for mockdesk
//!
//! Four cooperating components, each safe under concurrent access:
//!
//! - [`latency::LatencySimulator`] draws a per-request delay from a
//!   configurable distribution and actually suspends the handling task
//!   for that long.
//! - [`faults::FaultInjector`] evaluates named fault scenarios against
//!   a request and manufactures error responses.
//! - [`rate_limit::RateLimiter`] enforces burst, global, and
//!   per-endpoint quotas with token buckets.
//! - [`scenario::ScenarioManager`] switches the simulated backend
//!   between named behavior sets at runtime.
//!
//! The components know nothing about HTTP frameworks; they consume a
//! [`request::RequestProfile`] and are composed into a pipeline by the
//! server crate.

pub mod faults;
pub mod latency;
pub mod rate_limit;
pub mod request;
pub mod scenario;

pub use faults::{ErrorSimulation, FaultCondition, FaultDefinition, FaultInjector, FaultScenario};
pub use latency::{LatencyPattern, LatencySimulator, LatencyStatistics};
pub use rate_limit::{RateLimitResult, RateLimitStatistics, RateLimiter};
pub use request::RequestProfile;
pub use scenario::{BehaviorSet, HandlerOverride, ScenarioError, ScenarioManager};
