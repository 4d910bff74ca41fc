//! Fixed-window rate limiting.
//!
//! # Responsibilities
//! - Count requests per (client IP, scope) over fixed windows
//! - Enforce the global ceiling and optional per-route overrides
//! - Evict stale buckets so distinct-client churn cannot grow the table
//!   without bound
//!
//! # Design Decisions
//! - Fixed window, not leaky bucket: O(1) bookkeeping per request; bursts
//!   at window boundaries are an accepted trade-off
//! - The triggering (rejected) request stays counted, so a client cannot
//!   extend its effective throughput by racing the window reset
//! - Reset-and-increment happens under the map's exclusive entry guard,
//!   making the check a single indivisible operation under parallelism

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::{RateLimitConfig, RouteRateLimit};
use crate::error::GatewayError;
use crate::observability::metrics;

/// Scope of a rate limit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    /// Keyed by route prefix.
    Route(String),
}

impl Scope {
    fn label(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Route(prefix) => prefix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    client: IpAddr,
    scope: Scope,
}

/// One client's counter within the current window.
#[derive(Debug)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// Shared fixed-window limiter for all scopes.
pub struct RateLimiter {
    buckets: DashMap<BucketKey, Bucket>,
    global_window: Duration,
    global_max: u32,
    /// Buckets idle longer than this are evicted by the sweep.
    sweep_ttl: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let global_window = Duration::from_secs(config.window_secs);
        Self {
            buckets: DashMap::new(),
            global_window,
            global_max: config.max_requests,
            sweep_ttl: global_window * 2,
        }
    }

    /// Check the global scope for a client. The count is incremented even
    /// when the request is rejected.
    pub fn check_global(&self, client: IpAddr) -> Result<(), GatewayError> {
        self.check(client, Scope::Global, self.global_window, self.global_max)
    }

    /// Check a per-route override scope for a client.
    pub fn check_route(
        &self,
        client: IpAddr,
        prefix: &str,
        limit: &RouteRateLimit,
    ) -> Result<(), GatewayError> {
        self.check(
            client,
            Scope::Route(prefix.to_string()),
            Duration::from_secs(limit.window_secs),
            limit.max_requests,
        )
    }

    fn check(
        &self,
        client: IpAddr,
        scope: Scope,
        window: Duration,
        max: u32,
    ) -> Result<(), GatewayError> {
        let now = Instant::now();
        let key = BucketKey {
            client,
            scope: scope.clone(),
        };

        // The entry guard is exclusive, so reset + increment + compare is
        // atomic with respect to other requests for the same key.
        let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 0;
        }
        bucket.count = bucket.count.saturating_add(1);

        if bucket.count > max {
            drop(bucket);
            tracing::warn!(client = %client, scope = %scope.label(), "Rate limit exceeded");
            metrics::record_rate_limited(scope.label());
            Err(GatewayError::RateLimitExceeded {
                scope: scope.label().to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Number of live buckets (exposed for the sweep and for tests).
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn sweep(&self) {
        let now = Instant::now();
        let ttl = self.sweep_ttl;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.window_start) < ttl);
    }

    /// Spawn the periodic eviction sweep. Exits on shutdown signal.
    pub fn spawn_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let limiter = Arc::clone(self);
        let period = limiter.sweep_ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = limiter.bucket_count();
                        limiter.sweep();
                        let evicted = before - limiter.bucket_count();
                        if evicted > 0 {
                            tracing::debug!(evicted, "Rate limit bucket sweep");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        });
    }
}
