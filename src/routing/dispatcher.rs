//! Per-request dispatch.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → route lookup (404 with configured prefixes on no match)
//!     → rate limiter: global scope, then route override scope
//!     → gate chain in declared order (first rejection wins)
//!     → proxy forwarder (timeout/retry)
//!     → response, or a classified failure mapped to its JSON shape
//! ```
//!
//! Routing and rate-limit failures are resolved here and never reach the
//! forwarder. Forwarder exhaustion surfaces as a uniform 503 naming the
//! service; upstream 4xx responses pass through unmodified.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::proxy::{Forwarder, ProxyContext};
use crate::rate_limit::RateLimiter;
use crate::routing::table::RouteTable;

/// Composes the route table, rate limiter, and forwarder into the
/// per-request control flow. Stateless between requests except through the
/// shared limiter buckets.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    limiter: Arc<RateLimiter>,
    forwarder: Arc<Forwarder>,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>, limiter: Arc<RateLimiter>, forwarder: Arc<Forwarder>) -> Self {
        Self {
            table,
            limiter,
            forwarder,
        }
    }

    pub async fn dispatch(
        &self,
        client: IpAddr,
        request_id: String,
        request: Request<Body>,
    ) -> Response {
        let started = Instant::now();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        let response = match self.handle(client, &request_id, request, started).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = %err,
                    "Request resolved in dispatcher"
                );
                err.into_response()
            }
        };

        // Metrics are labeled by matched prefix, never the raw path, so
        // hostile traffic cannot mint new series.
        let route = route_label(&self.table, &path);
        metrics::record_request(&method, response.status().as_u16(), &route, started);
        response
    }

    async fn handle(
        &self,
        client: IpAddr,
        request_id: &str,
        request: Request<Body>,
        started: Instant,
    ) -> Result<Response, GatewayError> {
        let route = self.table.match_path(request.uri().path()).ok_or_else(|| {
            tracing::warn!(
                request_id = %request_id,
                path = %request.uri().path(),
                "No route matched"
            );
            GatewayError::RouteNotFound {
                path: request.uri().path().to_string(),
                method: request.method().to_string(),
                available_routes: self.table.prefixes().to_vec(),
            }
        })?;

        self.limiter.check_global(client)?;
        if let Some(limit) = &route.rate_limit {
            self.limiter.check_route(client, &route.prefix, limit)?;
        }

        let (parts, body) = request.into_parts();

        for gate in &route.gates {
            if let Err(rejection) = gate.evaluate(&parts).await {
                tracing::info!(
                    request_id = %request_id,
                    route = %route.prefix,
                    gate = gate.name(),
                    reason = %rejection,
                    "Gate rejected request"
                );
                return Err(rejection);
            }
        }

        let mut ctx = ProxyContext::new(route.clone(), request_id.to_string(), started);
        match self.forwarder.forward(&mut ctx, parts, body, client).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    route = %ctx.route.prefix,
                    service = %ctx.route.service,
                    attempts = ctx.attempt,
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Retry budget exhausted"
                );
                Err(GatewayError::Unavailable {
                    service: ctx.route.service.clone(),
                })
            }
        }
    }
}

/// Metric label for a request path: the matched route prefix, or a single
/// shared bucket for everything unrouted.
fn route_label(table: &RouteTable, path: &str) -> String {
    table
        .match_path(path)
        .map(|route| route.prefix.clone())
        .unwrap_or_else(|| "unmatched".to_string())
}
