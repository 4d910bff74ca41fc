//! API Gateway Library
//!
//! An HTTP gateway that routes, authenticates, rate-limits, and forwards
//! traffic to backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                   API GATEWAY                    │
//!                 │                                                  │
//!  Client ────────┼─▶ http/server ─▶ routing/dispatcher              │
//!                 │        │              │                          │
//!                 │        │              ├─▶ rate_limit (windows)   │
//!                 │        │              ├─▶ middleware (gates)     │
//!                 │        │              └─▶ proxy/forwarder ───────┼──▶ Backends
//!                 │        │                                         │
//!                 │        └─▶ /health ─▶ health/aggregator ─▶ cache │
//!                 │                                                  │
//!                 │  cross-cutting: config, observability, lifecycle │
//!                 └──────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod proxy;
pub mod rate_limit;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
