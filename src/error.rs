//! Gateway error taxonomy.
//!
//! Every gateway-originated failure maps to a stable JSON shape with enough
//! context to act on (path, service, timestamp) and no internal addressing
//! details. Upstream 4xx responses are not errors; they pass through the
//! forwarder unmodified and never reach this module.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Errors resolved within the dispatcher before (or instead of) forwarding.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("no route matches {path}")]
    RouteNotFound {
        path: String,
        method: String,
        available_routes: Vec<String>,
    },

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("rate limit exceeded for {scope}")]
    RateLimitExceeded { scope: String },

    /// Forwarder retry budget exhausted for a route.
    #[error("upstream unavailable: {service}")]
    Unavailable { service: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthRejected(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            GatewayError::RouteNotFound {
                path,
                method,
                available_routes,
            } => json!({
                "error": "Route not found",
                "path": path,
                "method": method,
                "availableRoutes": available_routes,
            }),
            GatewayError::RateLimitExceeded { .. } => json!({
                "error": "Too many requests from this IP, please try again later.",
            }),
            GatewayError::Unavailable { service } => json!({
                "error": "Service temporarily unavailable",
                "service": service,
                "timestamp": Utc::now().to_rfc3339(),
            }),
            GatewayError::AuthRequired(reason) | GatewayError::AuthRejected(reason) => json!({
                "error": reason,
            }),
            GatewayError::Config(_) => json!({
                "error": "Internal server error",
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = GatewayError::RouteNotFound {
            path: "/nope".into(),
            method: "GET".into(),
            available_routes: vec!["/api/users".into()],
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = GatewayError::RateLimitExceeded {
            scope: "global".into(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = GatewayError::Unavailable {
            service: "user-service".into(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
