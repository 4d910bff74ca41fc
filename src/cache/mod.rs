//! Cache store connection (redis).
//!
//! # Responsibilities
//! - Own the single shared redis connection
//! - Answer bounded-time `PING` probes for the health aggregator
//! - Release the connection cleanly on shutdown
//!
//! # Design Decisions
//! - Reconnection is an explicit state machine
//!   (Disconnected → Connecting → Connected → Backoff → Connecting …)
//!   rather than the driver's opaque retry strategy
//! - Backoff delay is capped linear: `min(retries × 50ms, 500ms)`
//! - `close()` is called only by the shutdown path; it transitions the
//!   state machine to Disconnected so late probes fail fast instead of
//!   racing the teardown

use std::time::{Duration, Instant};

use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache store is not connected")]
    NotConnected,

    #[error("cache probe timed out")]
    Timeout,
}

/// Connection state machine.
enum ConnState {
    Disconnected,
    Connecting,
    Connected(MultiplexedConnection),
    Backoff { retries: u32, until: Instant },
}

impl ConnState {
    fn name(&self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected(_) => "connected",
            ConnState::Backoff { .. } => "backoff",
        }
    }
}

/// Capped linear reconnect delay.
fn reconnect_delay(retries: u32) -> Duration {
    Duration::from_millis((retries as u64 * 50).min(500))
}

/// Shared handle to the cache store.
pub struct CacheStore {
    client: redis::Client,
    state: Mutex<ConnState>,
}

impl CacheStore {
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            state: Mutex::new(ConnState::Disconnected),
        })
    }

    /// Establish the initial connection.
    pub async fn connect(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        *state = ConnState::Connecting;
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                tracing::info!("Connected to cache store");
                *state = ConnState::Connected(conn);
                Ok(())
            }
            Err(e) => {
                *state = ConnState::Backoff {
                    retries: 1,
                    until: Instant::now() + reconnect_delay(1),
                };
                Err(CacheError::Redis(e))
            }
        }
    }

    /// Bounded-time liveness probe. Drives the reconnect state machine:
    /// a failed ping moves to Backoff, and a probe arriving after the
    /// backoff deadline attempts a reconnect first.
    pub async fn ping(&self, timeout: Duration) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;

        loop {
            match &mut *state {
                ConnState::Connected(conn) => {
                    let cmd = redis::cmd("PING");
                    let ping = cmd.query_async::<String>(conn);
                    match tokio::time::timeout(timeout, ping).await {
                        Ok(Ok(_)) => return Ok(()),
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "Cache ping failed, entering backoff");
                            *state = ConnState::Backoff {
                                retries: 1,
                                until: Instant::now() + reconnect_delay(1),
                            };
                            return Err(CacheError::Redis(e));
                        }
                        Err(_) => {
                            tracing::warn!("Cache ping timed out, entering backoff");
                            *state = ConnState::Backoff {
                                retries: 1,
                                until: Instant::now() + reconnect_delay(1),
                            };
                            return Err(CacheError::Timeout);
                        }
                    }
                }
                ConnState::Backoff { retries, until } => {
                    if Instant::now() < *until {
                        return Err(CacheError::NotConnected);
                    }
                    let retries = *retries;
                    *state = ConnState::Connecting;
                    match tokio::time::timeout(
                        timeout,
                        self.client.get_multiplexed_async_connection(),
                    )
                    .await
                    {
                        Ok(Ok(conn)) => {
                            tracing::info!("Reconnected to cache store");
                            *state = ConnState::Connected(conn);
                            // Fall through to ping on the fresh connection.
                        }
                        Ok(Err(e)) => {
                            let retries = retries + 1;
                            *state = ConnState::Backoff {
                                retries,
                                until: Instant::now() + reconnect_delay(retries),
                            };
                            return Err(CacheError::Redis(e));
                        }
                        Err(_) => {
                            let retries = retries + 1;
                            *state = ConnState::Backoff {
                                retries,
                                until: Instant::now() + reconnect_delay(retries),
                            };
                            return Err(CacheError::Timeout);
                        }
                    }
                }
                ConnState::Connecting | ConnState::Disconnected => {
                    return Err(CacheError::NotConnected);
                }
            }
        }
    }

    /// Release the connection. Owned by the shutdown coordinator; in-flight
    /// probes serialize through the state lock, so close never races a read.
    pub async fn close(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, ConnState::Disconnected);
        match previous {
            ConnState::Connected(conn) => {
                // Dropping the multiplexed connection tears down the socket.
                drop(conn);
                tracing::info!("Cache store connection closed");
                Ok(())
            }
            other => {
                tracing::debug!(state = other.name(), "Cache store closed while not connected");
                Ok(())
            }
        }
    }
}
