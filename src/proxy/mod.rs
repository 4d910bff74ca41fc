//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher hands off (route, request head, buffered body)
//!     → forwarder.rs attempt loop:
//!         build upstream request (proxy headers, hop-by-hop stripped)
//!         → send with per-attempt deadline
//!         → classify outcome: response | Connect | Timeout | Upstream(5xx)
//!         → retryable and budget left? backoff.rs delay, next attempt
//!     → Ok(response) passed through, or Err(classified failure)
//! ```
//!
//! # Design Decisions
//! - Outcomes are explicit `Result` values consumed synchronously by the
//!   dispatcher, not side-effecting callbacks
//! - Attempts are strictly sequential; the body is buffered once and
//!   replayed, never forwarded twice concurrently
//! - A missed deadline drops the in-flight future, which cancels the
//!   connection rather than leaking it

pub mod backoff;
pub mod forwarder;

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use thiserror::Error;

use crate::routing::Route;

pub use forwarder::Forwarder;

/// Classified forwarding failure, used to decide retry eligibility.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Target unreachable (connection refused, reset, DNS failure).
    #[error("connect error: {0}")]
    Connect(String),

    /// No response within the route's per-attempt timeout.
    #[error("upstream timeout")]
    Timeout,

    /// Target answered with a 5xx status.
    #[error("upstream returned {0}")]
    Upstream(StatusCode),
}

impl ForwardError {
    /// Connect errors, timeouts, and 5xx responses are retryable.
    /// 4xx never reaches this enum; it is a legitimate backend response.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForwardError::Connect(_) | ForwardError::Timeout => true,
            ForwardError::Upstream(status) => status.is_server_error(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ForwardError::Connect(_) => "connect_error",
            ForwardError::Timeout => "timeout",
            ForwardError::Upstream(_) => "upstream_error",
        }
    }
}

/// Ephemeral per-request forwarding state. Created when a request enters
/// the dispatcher, discarded when the response is sent.
pub struct ProxyContext {
    pub route: Arc<Route>,
    pub request_id: String,
    pub started: Instant,
    /// Attempts made so far; never exceeds `route.max_retries + 1`.
    pub attempt: u32,
}

impl ProxyContext {
    pub fn new(route: Arc<Route>, request_id: String, started: Instant) -> Self {
        Self {
            route,
            request_id,
            started,
            attempt: 0,
        }
    }
}
