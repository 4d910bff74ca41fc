//! Configuration loading from disk and environment.

use std::env;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid value for {var}: {value}")]
    Env { var: String, value: String },

    #[error("Invalid target for route {prefix}: {reason}")]
    Target { prefix: String, reason: String },
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration.
///
/// Precedence, lowest to highest: built-in defaults, the TOML file named by
/// `GATEWAY_CONFIG` (if set), then the enumerated environment variables.
pub fn load() -> Result<GatewayConfig, ConfigError> {
    let mut config = match env::var("GATEWAY_CONFIG") {
        Ok(path) => {
            let content = fs::read_to_string(Path::new(&path))?;
            toml::from_str(&content)?
        }
        Err(_) => GatewayConfig::default(),
    };

    apply_env(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment variable overrides to a configuration.
pub fn apply_env(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    if let Ok(port) = env::var("GATEWAY_PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "GATEWAY_PORT".into(),
            value: port.clone(),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    for (var, service) in [
        ("USER_SERVICE_URL", "user-service"),
        ("PRODUCT_SERVICE_URL", "product-service"),
        ("ORDER_SERVICE_URL", "order-service"),
    ] {
        if let Ok(target) = env::var(var) {
            for route in config.routes.iter_mut().filter(|r| r.service == service) {
                route.target = target.clone();
            }
        }
    }

    if let Ok(url) = env::var("REDIS_URL") {
        config.cache.url = url;
    }

    if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }

    if let Ok(max) = env::var("RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = max.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_MAX".into(),
            value: max.clone(),
        })?;
    }

    if let Ok(window) = env::var("RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = window.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_WINDOW_SECS".into(),
            value: window.clone(),
        })?;
    }

    if let Ok(keys) = env::var("GATEWAY_API_KEYS") {
        config.auth.api_keys = keys
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }

    Ok(())
}
