//! Simulated CMS backend server
//!
//! Wraps the simulation engine in an axum router. Every resource
//! request passes through the interception pipeline (scenario faults,
//! shared fault injection, latency, admission control) before it can
//! reach a handler; any stage may short-circuit with a manufactured
//! response.

pub mod app;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod pipeline;
pub mod request_log;

pub use app::SimulationServer;
pub use context::SimContext;
pub use errors::{ApiError, ApiResult};
pub use request_log::{RequestLog, RequestLogEntry};
