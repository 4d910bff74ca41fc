//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack: request ID, trace, CORS,
//!       body limit)
//!     → /health → health aggregator
//!     → everything else → routing dispatcher
//! ```

pub mod server;

pub use server::{AppState, GatewayServer};
