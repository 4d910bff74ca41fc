//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Connect cache → Start listener
//!
//! Shutdown:
//!     SIGTERM/SIGINT (signals.rs)
//!     → broadcast (shutdown.rs)
//!     → stop accepting, drain in-flight forwards
//!     → stop background tasks (sweeper)
//!     → close cache connection
//!     → exit 0, or 1 if the close fails
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
