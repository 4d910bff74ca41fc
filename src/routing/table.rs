//! Static route table.
//!
//! # Responsibilities
//! - Compile the configured routes into an immutable table at startup
//! - Look up the route for a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest-prefix-wins; ties broken by configuration order (stable sort)
//! - No regex in the hot path, prefix matching only
//! - Explicit `None` on no match rather than a silent default route

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::{ConfigError, RouteConfig, RouteRateLimit};
use crate::middleware::{AuthGate, AuthVerifier, Gate};

/// A compiled route entry. Immutable for the process lifetime.
pub struct Route {
    pub prefix: String,
    pub service: String,
    pub target: Url,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Ordered gates; first rejection wins.
    pub gates: Vec<Arc<dyn Gate>>,
    pub rate_limit: Option<RouteRateLimit>,
}

/// Immutable route table with deterministic longest-prefix matching.
pub struct RouteTable {
    /// Sorted by descending prefix length; stable sort preserves
    /// configuration order among equal lengths.
    routes: Vec<Arc<Route>>,
    /// Prefixes in configuration order, for diagnostics.
    prefixes: Vec<String>,
}

impl RouteTable {
    /// Compile the table. Prefix uniqueness is checked by config
    /// validation before this runs; target URLs are re-parsed here because
    /// the compiled route owns a `Url`, not a string.
    pub fn build(
        configs: &[RouteConfig],
        verifier: Arc<dyn AuthVerifier>,
    ) -> Result<Self, ConfigError> {
        let prefixes: Vec<String> = configs.iter().map(|r| r.prefix.clone()).collect();

        let mut routes = Vec::with_capacity(configs.len());
        for config in configs {
            let target = Url::parse(&config.target).map_err(|e| ConfigError::Target {
                prefix: config.prefix.clone(),
                reason: e.to_string(),
            })?;

            let mut gates: Vec<Arc<dyn Gate>> = Vec::new();
            if config.require_auth {
                gates.push(Arc::new(AuthGate::new(verifier.clone())));
            }

            routes.push(Arc::new(Route {
                prefix: config.prefix.clone(),
                service: config.service.clone(),
                target,
                timeout: Duration::from_secs(config.timeout_secs),
                max_retries: config.max_retries,
                gates,
                rate_limit: config.rate_limit.clone(),
            }));
        }

        routes.sort_by_key(|r| std::cmp::Reverse(r.prefix.len()));

        Ok(Self { routes, prefixes })
    }

    /// Find the route whose prefix matches the path. Longest prefix wins;
    /// among equal-length prefixes, configuration order decides.
    pub fn match_path(&self, path: &str) -> Option<Arc<Route>> {
        self.routes
            .iter()
            .find(|r| path.starts_with(&r.prefix))
            .cloned()
    }

    /// Configured prefixes in declaration order, for 404 diagnostics.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BearerKeyVerifier;

    fn route(prefix: &str, service: &str) -> RouteConfig {
        RouteConfig {
            prefix: prefix.into(),
            service: service.into(),
            target: "http://127.0.0.1:9999".into(),
            timeout_secs: 5,
            max_retries: 1,
            require_auth: false,
            rate_limit: None,
        }
    }

    fn table(configs: &[RouteConfig]) -> RouteTable {
        let verifier = Arc::new(BearerKeyVerifier::new(std::iter::empty()));
        RouteTable::build(configs, verifier).unwrap()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = table(&[route("/api", "general"), route("/api/users", "users")]);

        let matched = table.match_path("/api/users/42").unwrap();
        assert_eq!(matched.service, "users");

        let matched = table.match_path("/api/products").unwrap();
        assert_eq!(matched.service, "general");
    }

    #[test]
    fn test_no_match_is_none() {
        let table = table(&[route("/api/users", "users")]);
        assert!(table.match_path("/metrics").is_none());
        assert!(table.match_path("/").is_none());
    }

    #[test]
    fn test_equal_length_tie_uses_config_order() {
        let table = table(&[route("/api/aa", "first"), route("/api/ab", "second")]);
        // Distinct prefixes of equal length each match their own paths;
        // stable sort keeps declaration order for the scan.
        assert_eq!(table.match_path("/api/aa/x").unwrap().service, "first");
        assert_eq!(table.match_path("/api/ab/x").unwrap().service, "second");
    }

    #[test]
    fn test_prefixes_keep_declaration_order() {
        let table = table(&[route("/b", "b"), route("/aaaa", "a")]);
        assert_eq!(table.prefixes(), &["/b".to_string(), "/aaaa".to_string()]);
    }
}
