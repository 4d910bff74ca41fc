//! Upstream request forwarding with timeout and retry.

use std::net::IpAddr;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Request, Response, StatusCode, Uri};
use bytes::Bytes;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::observability::metrics;
use crate::proxy::backoff::calculate_backoff;
use crate::proxy::{ForwardError, ProxyContext};

/// Base delay between attempts; capped exponential from here.
const RETRY_BASE_DELAY_MS: u64 = 50;
const RETRY_MAX_DELAY_MS: u64 = 1000;

/// Maximum request body buffered for replay across attempts (10 MB).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Forwards requests to resolved backend targets.
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Forward a request to the context's route target.
    ///
    /// Returns the upstream response with status, headers, and body passed
    /// through unmodified (hop-by-hop headers excepted), or a classified
    /// failure once the retry budget is exhausted. Attempts are strictly
    /// sequential; each carries a hard deadline of `route.timeout`, and a
    /// missed deadline drops the in-flight call.
    pub async fn forward(
        &self,
        ctx: &mut ProxyContext,
        parts: Parts,
        body: Body,
        client_ip: IpAddr,
    ) -> Result<Response<Body>, ForwardError> {
        // Buffer once so retries replay the same bytes.
        let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id, error = %e, "Failed to read request body");
                return Ok(plain_response(StatusCode::BAD_REQUEST));
            }
        };

        let route = ctx.route.clone();
        let max_attempts = route.max_retries + 1;

        loop {
            ctx.attempt += 1;

            let request = self.build_upstream_request(ctx, &parts, body_bytes.clone(), client_ip)?;

            tracing::debug!(
                request_id = %ctx.request_id,
                route = %route.prefix,
                target = %request.uri(),
                attempt = ctx.attempt,
                max_attempts,
                "Forwarding attempt"
            );

            let outcome = match tokio::time::timeout(route.timeout, self.client.request(request)).await
            {
                Ok(Ok(response)) if response.status().is_server_error() => {
                    Err(ForwardError::Upstream(response.status()))
                }
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(ForwardError::Connect(e.to_string())),
                Err(_) => Err(ForwardError::Timeout),
            };

            match outcome {
                Ok(response) => {
                    metrics::record_upstream_attempt(&route.service, "success");
                    tracing::info!(
                        request_id = %ctx.request_id,
                        route = %route.prefix,
                        status = response.status().as_u16(),
                        attempt = ctx.attempt,
                        elapsed_ms = ctx.started.elapsed().as_millis() as u64,
                        "Upstream responded"
                    );
                    let (mut parts, incoming) = response.into_parts();
                    strip_hop_by_hop(&mut parts.headers);
                    return Ok(Response::from_parts(parts, Body::new(incoming)));
                }
                Err(err) => {
                    metrics::record_upstream_attempt(&route.service, err.label());
                    if err.is_retryable() && ctx.attempt < max_attempts {
                        let delay = calculate_backoff(ctx.attempt, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS);
                        tracing::info!(
                            request_id = %ctx.request_id,
                            route = %route.prefix,
                            attempt = ctx.attempt,
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "Attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    fn build_upstream_request(
        &self,
        ctx: &ProxyContext,
        parts: &Parts,
        body: Bytes,
        client_ip: IpAddr,
    ) -> Result<Request<Body>, ForwardError> {
        let route = &ctx.route;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let authority = route.target.authority();
        let uri: Uri = format!("{}://{}{}", route.target.scheme(), authority, path_and_query)
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ForwardError::Connect(e.to_string()))?;

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .version(parts.version);

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                if !is_hop_by_hop(name) {
                    headers.insert(name.clone(), value.clone());
                }
            }

            // The target sees its own authority, not the gateway's.
            if let Ok(host) = HeaderValue::from_str(authority) {
                headers.insert(axum::http::header::HOST, host);
            }

            let ip = client_ip.to_string();
            if let Ok(value) = HeaderValue::from_str(&ip) {
                headers.insert(HeaderName::from_static("x-forwarded-for"), value.clone());
                headers.insert(HeaderName::from_static("x-real-ip"), value);
            }
            headers.insert(
                HeaderName::from_static("x-forwarded-proto"),
                HeaderValue::from_static("http"),
            );
            if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
                headers.insert(HeaderName::from_static("x-request-id"), value);
            }
        }

        builder
            .body(Body::from(body))
            .map_err(|e| ForwardError::Connect(e.to_string()))
    }
}

fn plain_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

fn strip_hop_by_hop(headers: &mut axum::http::HeaderMap) {
    let names: Vec<HeaderName> = headers
        .keys()
        .filter(|&name| is_hop_by_hop(name))
        .cloned()
        .collect();
    for name in names {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_classification() {
        assert!(is_hop_by_hop(&HeaderName::from_static("connection")));
        assert!(is_hop_by_hop(&HeaderName::from_static("transfer-encoding")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("content-type")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("authorization")));
    }
}
