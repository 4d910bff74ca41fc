//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the subsystems into per-request state
//! - Build the Axum router and middleware layers
//! - Serve with graceful shutdown wired to the coordinator

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, CorsConfig, GatewayConfig};
use crate::health::{CacheProbe, HealthAggregator};
use crate::lifecycle::Shutdown;
use crate::middleware::{AuthVerifier, BearerKeyVerifier};
use crate::proxy::Forwarder;
use crate::rate_limit::RateLimiter;
use crate::routing::{Dispatcher, RouteTable};

/// Maximum accepted request body (matches the forwarder's replay buffer).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub health: Arc<HealthAggregator>,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    router: Router,
    prefixes: Vec<String>,
}

impl GatewayServer {
    /// Wire the subsystems together from a validated configuration.
    /// Spawns the rate-limit sweeper, so this must run inside a runtime.
    pub fn new(
        config: &GatewayConfig,
        cache: Arc<dyn CacheProbe>,
        shutdown: &Shutdown,
    ) -> Result<Self, ConfigError> {
        let verifier: Arc<dyn AuthVerifier> =
            Arc::new(BearerKeyVerifier::new(config.auth.api_keys.iter().cloned()));
        let table = Arc::new(RouteTable::build(&config.routes, verifier)?);
        let prefixes = table.prefixes().to_vec();

        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        limiter.spawn_sweeper(shutdown.subscribe());

        let forwarder = Arc::new(Forwarder::new());
        let dispatcher = Arc::new(Dispatcher::new(table, limiter, forwarder));
        let health = Arc::new(HealthAggregator::new(&config.health, &config.routes, cache));

        let state = AppState { dispatcher, health };
        let router = Self::build_router(config, state);

        Ok(Self { router, prefixes })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(cors_layer(&config.cors)),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = ?self.prefixes,
            "API gateway listening"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Aggregated liveness query, served gateway-locally.
async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.health.aggregate().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

/// Everything that is not `/health` goes through the dispatcher.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    state.dispatcher.dispatch(addr.ip(), request_id, request).await
}
