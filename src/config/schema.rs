//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Static route table mapping path prefixes to backend services.
    pub routes: Vec<RouteConfig>,

    /// Global rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Authentication settings for auth-gated routes.
    pub auth: AuthConfig,

    /// Allowed CORS origins.
    pub cors: CorsConfig,

    /// Cache store (redis) settings.
    pub cache: CacheConfig,

    /// Health aggregation settings.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// A single route: path prefix, target service, and per-route policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match (longest prefix wins).
    pub prefix: String,

    /// Service name, used in logs, health records, and error bodies.
    pub service: String,

    /// Target base URL (e.g., "http://user-service:3001").
    pub target: String,

    /// Per-attempt upstream timeout in seconds.
    #[serde(default = "default_route_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retry attempts after the first (connect/timeout/5xx only).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Require a verified identity before forwarding.
    #[serde(default)]
    pub require_auth: bool,

    /// Per-route rate limit override (scoped to this route's prefix).
    #[serde(default)]
    pub rate_limit: Option<RouteRateLimit>,
}

fn default_route_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Per-route rate limit override.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRateLimit {
    /// Window duration in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,
}

/// Global fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window duration in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // 15 minutes, 1000 requests per client IP
            window_secs: 15 * 60,
            max_requests: 1000,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted bearer API keys for the shipped verifier.
    pub api_keys: Vec<String>,
}

/// CORS settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Cache store (redis) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis connection URL.
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Health aggregation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Ceiling for the whole aggregation pass, in seconds. Any probe that
    /// has not returned by then is reported unhealthy.
    pub probe_ceiling_secs: u64,

    /// Path probed on each backend.
    pub probe_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_ceiling_secs: 2,
            probe_path: "/health".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: default_routes(),
            rate_limit: RateLimitConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            cache: CacheConfig::default(),
            health: HealthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// The static route table: three backend services behind five prefixes.
fn default_routes() -> Vec<RouteConfig> {
    let route = |prefix: &str, service: &str, target: &str, require_auth: bool| RouteConfig {
        prefix: prefix.to_string(),
        service: service.to_string(),
        target: target.to_string(),
        timeout_secs: default_route_timeout_secs(),
        max_retries: default_max_retries(),
        require_auth,
        rate_limit: None,
    };

    let user = "http://user-service:3001";
    let product = "http://product-service:3002";
    let order = "http://order-service:3003";

    let mut auth_route = route("/api/auth", "user-service", user, false);
    // Tighter ceiling on the credential endpoint.
    auth_route.rate_limit = Some(RouteRateLimit {
        window_secs: 15 * 60,
        max_requests: 50,
    });

    vec![
        auth_route,
        route("/api/users", "user-service", user, true),
        route("/api/products", "product-service", product, false),
        route("/api/categories", "product-service", product, false),
        route("/api/orders", "order-service", order, true),
    ]
}
