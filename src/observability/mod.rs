//! Observability subsystem.
//!
//! # Responsibilities
//! - Initialize structured logging (tracing + env filter)
//! - Record gateway metrics and expose them for Prometheus scraping
//!
//! # Design Decisions
//! - Logging is structured fields, not formatted strings
//! - Metric updates are low-overhead facade calls; the exporter is
//!   optional and off by default

pub mod logging;
pub mod metrics;
