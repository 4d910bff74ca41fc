//! Authentication gate.
//!
//! The gate itself only extracts credentials from the request head; the
//! actual verification is delegated to an [`AuthVerifier`], which is an
//! external collaborator (it may call out over the network). Tests inject
//! mock verifiers to observe the short-circuit behavior.

use std::collections::HashSet;

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::error::GatewayError;
use crate::middleware::Gate;

/// A verified caller identity attached to allowed requests.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
}

/// External credential verifier.
///
/// `Err` carries the rejection reason shown to the caller.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, credentials: &str) -> Result<Identity, String>;
}

/// Verifier accepting a configured set of bearer API keys.
pub struct BearerKeyVerifier {
    keys: HashSet<String>,
}

impl BearerKeyVerifier {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AuthVerifier for BearerKeyVerifier {
    async fn verify(&self, credentials: &str) -> Result<Identity, String> {
        if self.keys.contains(credentials) {
            Ok(Identity {
                subject: "api-key".to_string(),
            })
        } else {
            Err("Invalid credentials".to_string())
        }
    }
}

/// Gate requiring a verified `Authorization: Bearer` credential.
pub struct AuthGate {
    verifier: std::sync::Arc<dyn AuthVerifier>,
}

impl AuthGate {
    pub fn new(verifier: std::sync::Arc<dyn AuthVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Gate for AuthGate {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn evaluate(&self, parts: &Parts) -> Result<Option<Identity>, GatewayError> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| GatewayError::AuthRequired("Missing authorization header".into()))?;

        let credentials = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::AuthRequired("Expected bearer credentials".into()))?;

        match self.verifier.verify(credentials).await {
            Ok(identity) => Ok(Some(identity)),
            Err(reason) => Err(GatewayError::AuthRejected(reason)),
        }
    }
}
