//! Health aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! /health query
//!     → aggregator.rs: cache PING + one GET per backend, concurrently,
//!       every probe individually bounded by the overall ceiling
//!     → per-service records + overall status
//!     → JSON report (200 healthy / 503 unhealthy)
//! ```
//!
//! # Design Decisions
//! - Overall status follows the cache probe alone; a crashed backend is
//!   reported but does not flip the gateway unhealthy, because other
//!   routes may still be servable
//! - Records are recomputed per query, never persisted
//! - A probe that misses the ceiling counts as unhealthy for that entry

pub mod aggregator;

pub use aggregator::{CacheProbe, HealthAggregator, HealthReport, HealthStatus, ServiceHealth};
