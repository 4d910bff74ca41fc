//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → validate (duplicate prefixes rejected)
//!     → compile targets, gates, policy
//!     → sort by descending prefix length (stable)
//!     → freeze as immutable RouteTable
//!
//! Per request:
//!     dispatcher.rs drives lookup → rate limit → gates → forwarder
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic matching: longest prefix wins, ties by config order
//! - Exactly one route matches a given path, or none

pub mod dispatcher;
pub mod table;

pub use dispatcher::Dispatcher;
pub use table::{Route, RouteTable};
