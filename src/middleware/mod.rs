//! Per-route request gates.
//!
//! A route carries an ordered list of gates evaluated before forwarding.
//! Gates execute strictly in declared order and the first rejection wins:
//! the dispatcher returns the rejection and the forwarder is never invoked.
//!
//! # Design Decisions
//! - Gates are plain trait objects held directly on the route entry; no
//!   dynamic registration after startup
//! - A gate inspects request head only (method, URI, headers); bodies are
//!   not available to gates
//! - Rejections are ordinary `GatewayError` values, so the chain
//!   short-circuits through `?` in the dispatcher

pub mod auth;

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::error::GatewayError;

pub use auth::{AuthGate, AuthVerifier, BearerKeyVerifier, Identity};

/// A request-gating step.
#[async_trait]
pub trait Gate: Send + Sync {
    /// Gate name, for logs.
    fn name(&self) -> &'static str;

    /// Inspect the request head; `Ok` allows the request to proceed
    /// (optionally attaching a verified identity), `Err` rejects it.
    async fn evaluate(&self, parts: &Parts) -> Result<Option<Identity>, GatewayError>;
}
