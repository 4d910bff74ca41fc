//! Cross-service health aggregation.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use url::Url;

use crate::cache::CacheStore;
use crate::config::{HealthConfig, RouteConfig};
use crate::observability::metrics;

/// Liveness probe against the cache store. The aggregator depends on this
/// capability, not on the concrete store, so tests can stub it.
#[async_trait]
pub trait CacheProbe: Send + Sync {
    async fn probe(&self, timeout: Duration) -> Result<(), String>;
}

#[async_trait]
impl CacheProbe for CacheStore {
    async fn probe(&self, timeout: Duration) -> Result<(), String> {
        self.ping(timeout).await.map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// One service's record within a health report.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resident set size, when the platform exposes it.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub rss_bytes: u64,
}

/// The `/health` response body.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(rename = "uptime")]
    pub uptime_secs: u64,
    pub memory: Option<MemoryUsage>,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

struct BackendTarget {
    service: String,
    probe_url: String,
}

/// Answers liveness queries by probing the cache store and every
/// configured backend concurrently within a bounded ceiling.
pub struct HealthAggregator {
    cache: std::sync::Arc<dyn CacheProbe>,
    backends: Vec<BackendTarget>,
    client: Client<HttpConnector, Body>,
    ceiling: Duration,
    started: Instant,
}

impl HealthAggregator {
    pub fn new(
        config: &HealthConfig,
        routes: &[RouteConfig],
        cache: std::sync::Arc<dyn CacheProbe>,
    ) -> Self {
        // One probe target per distinct service; routes share backends.
        let mut backends: Vec<BackendTarget> = Vec::new();
        for route in routes {
            if backends.iter().any(|b| b.service == route.service) {
                continue;
            }
            if let Ok(target) = Url::parse(&route.target) {
                let base = target.as_str().trim_end_matches('/').to_string();
                backends.push(BackendTarget {
                    service: route.service.clone(),
                    probe_url: format!("{base}{}", config.probe_path),
                });
            }
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            cache,
            backends,
            client,
            ceiling: Duration::from_secs(config.probe_ceiling_secs),
            started: Instant::now(),
        }
    }

    /// Run one aggregation pass. Never blocks longer than the ceiling:
    /// every probe is wrapped in it individually and they run concurrently.
    pub async fn aggregate(&self) -> HealthReport {
        // The cache probe spends its budget internally on reconnect plus
        // ping; the outer deadline keeps this pass bounded even when that
        // internal budget overruns.
        let cache_probe = async {
            match tokio::time::timeout(self.ceiling, self.cache.probe(self.ceiling)).await {
                Ok(result) => result,
                Err(_) => Err("probe timeout".to_string()),
            }
        };

        let backend_probes = join_all(
            self.backends
                .iter()
                .map(|backend| self.probe_backend(backend)),
        );

        let (cache_result, backend_results) = tokio::join!(cache_probe, backend_probes);

        let mut services = BTreeMap::new();
        let now = Utc::now();

        let (cache_status, cache_error) = match cache_result {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                tracing::warn!(error = %e, "Cache store probe failed");
                (HealthStatus::Unhealthy, Some(e))
            }
        };
        services.insert(
            "cache-store".to_string(),
            ServiceHealth {
                status: cache_status,
                checked_at: now,
                error: cache_error,
            },
        );

        for (backend, result) in self.backends.iter().zip(backend_results) {
            let (status, error) = match result {
                Ok(()) => (HealthStatus::Healthy, None),
                Err(e) => (HealthStatus::Unhealthy, Some(e)),
            };
            metrics::record_backend_health(&backend.service, status == HealthStatus::Healthy);
            services.insert(
                backend.service.clone(),
                ServiceHealth {
                    status,
                    checked_at: now,
                    error,
                },
            );
        }

        // The gateway's own status follows the cache probe alone.
        HealthReport {
            status: cache_status,
            timestamp: now,
            service: "api-gateway",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.started.elapsed().as_secs(),
            memory: read_rss(),
            services,
        }
    }

    async fn probe_backend(&self, backend: &BackendTarget) -> Result<(), String> {
        let request = Request::builder()
            .method("GET")
            .uri(backend.probe_url.as_str())
            .header("user-agent", "api-gateway-health-check")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        match tokio::time::timeout(self.ceiling, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(format!("HTTP {}", response.status().as_u16())),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("probe timeout".to_string()),
        }
    }
}

/// Resident set size from /proc, Linux only.
#[cfg(target_os = "linux")]
fn read_rss() -> Option<MemoryUsage> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(MemoryUsage {
        rss_bytes: pages * 4096,
    })
}

#[cfg(not(target_os = "linux"))]
fn read_rss() -> Option<MemoryUsage> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    struct StubProbe {
        ok: bool,
    }

    #[async_trait]
    impl CacheProbe for StubProbe {
        async fn probe(&self, _timeout: Duration) -> Result<(), String> {
            if self.ok {
                Ok(())
            } else {
                Err("connection refused".to_string())
            }
        }
    }

    fn aggregator(cache_ok: bool) -> HealthAggregator {
        let config = GatewayConfig::default();
        // Unroutable targets; every backend probe fails fast or times out.
        HealthAggregator::new(
            &HealthConfig {
                probe_ceiling_secs: 1,
                probe_path: "/health".into(),
            },
            &config.routes,
            std::sync::Arc::new(StubProbe { ok: cache_ok }),
        )
    }

    #[tokio::test]
    async fn test_overall_status_follows_cache_only() {
        let report = aggregator(true).aggregate().await;
        assert!(report.is_healthy());
        // Backends are down but do not flip the gateway unhealthy.
        assert_eq!(
            report.services["user-service"].status,
            HealthStatus::Unhealthy
        );
        assert_eq!(
            report.services["cache-store"].status,
            HealthStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_cache_failure_makes_gateway_unhealthy() {
        let report = aggregator(false).aggregate().await;
        assert!(!report.is_healthy());
        assert!(report.services["cache-store"].error.is_some());
    }

    #[tokio::test]
    async fn test_aggregation_is_bounded() {
        let started = Instant::now();
        let _ = aggregator(true).aggregate().await;
        // Ceiling 1s, probes run concurrently; allow scheduling slack.
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    struct SlowProbe;

    #[async_trait]
    impl CacheProbe for SlowProbe {
        async fn probe(&self, _timeout: Duration) -> Result<(), String> {
            // Models a reconnect-then-ping sequence overrunning its budget.
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overrunning_cache_probe_is_cut_off_at_ceiling() {
        let config = GatewayConfig::default();
        let aggregator = HealthAggregator::new(
            &HealthConfig {
                probe_ceiling_secs: 1,
                probe_path: "/health".into(),
            },
            &config.routes,
            std::sync::Arc::new(SlowProbe),
        );

        let started = Instant::now();
        let report = aggregator.aggregate().await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!report.is_healthy());
        assert_eq!(
            report.services["cache-store"].error.as_deref(),
            Some("probe timeout")
        );
    }

    #[tokio::test]
    async fn test_one_record_per_distinct_service() {
        let report = aggregator(true).aggregate().await;
        // Three backends plus the cache store, despite five routes.
        assert_eq!(report.services.len(), 4);
    }
}
