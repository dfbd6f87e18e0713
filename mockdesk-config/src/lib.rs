//! Domain-driven configuration for the mockdesk simulation engine
//!
//! Configuration is split by functional domain (server, latency,
//! rate limiting, faults), each with serde defaults and a validation
//! pass. All knobs are constructor-time: the simulation has no runtime
//! CLI surface.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    faults::FaultConfig,
    latency::{GeoTier, LatencyConfig, LatencyDistribution, NetworkProfile},
    logging::LoggingConfig,
    rate_limit::{EndpointLimit, RateLimitConfig},
    server::ServerConfig,
    SimulationConfig,
};
