//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file named by GATEWAY_CONFIG)
//!     → loader.rs (environment variable overrides)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults so the gateway runs with no config at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    AuthConfig, CacheConfig, CorsConfig, GatewayConfig, HealthConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RouteConfig, RouteRateLimit,
};
