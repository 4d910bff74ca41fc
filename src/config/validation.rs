//! Configuration validation.
//!
//! Serde handles syntactic validation; this module performs the semantic
//! checks and returns all failures, not just the first. Duplicate route
//! prefixes are rejected here so ambiguous routing is a startup error,
//! never a runtime one.

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("route table is empty")]
    NoRoutes,

    #[error("route '{0}': prefix must start with '/'")]
    BadPrefix(String),

    #[error("duplicate route prefix '{0}'")]
    DuplicatePrefix(String),

    #[error("route '{prefix}': invalid target URL '{target}'")]
    BadTarget { prefix: String, target: String },

    #[error("route '{0}': timeout must be greater than zero")]
    ZeroTimeout(String),

    #[error("rate limit ceiling must be greater than zero")]
    ZeroRateLimit,

    #[error("rate limit window must be greater than zero")]
    ZeroWindow,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::BadPrefix(route.prefix.clone()));
        }
        if !seen.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.prefix.clone()));
        }
        if Url::parse(&route.target).is_err() {
            errors.push(ValidationError::BadTarget {
                prefix: route.prefix.clone(),
                target: route.target.clone(),
            });
        }
        if route.timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout(route.prefix.clone()));
        }
        if let Some(limit) = &route.rate_limit {
            if limit.max_requests == 0 {
                errors.push(ValidationError::ZeroRateLimit);
            }
            if limit.window_secs == 0 {
                errors.push(ValidationError::ZeroWindow);
            }
        }
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimit);
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut config = GatewayConfig::default();
        let dup = config.routes[0].clone();
        config.routes.push(dup);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicatePrefix(p) if p == "/api/auth")));
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = GatewayConfig::default();
        config.routes[0].prefix = "no-slash".into();
        config.routes[1].target = "not a url".into();
        config.rate_limit.max_requests = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
