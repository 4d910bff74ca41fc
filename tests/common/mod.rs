//! Shared utilities for integration testing.
//!
//! Mock backends speak raw HTTP/1.1 over TCP so tests control exactly what
//! the gateway sees on the wire. Everything binds to port 0 and reports the
//! assigned address back to the caller.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use api_gateway::config::{GatewayConfig, RouteConfig};
use api_gateway::health::CacheProbe;
use api_gateway::{GatewayServer, Shutdown};

/// Start a simple mock backend that returns a fixed 200 response.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        drain_request(&mut socket).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a programmable mock backend. The closure decides the status and
/// body for each incoming request.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        drain_request(&mut socket).await;
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that accepts connections but never responds. Used to
/// trigger per-attempt timeouts in the gateway.
#[allow(dead_code)]
pub async fn start_hanging_backend() -> (SocketAddr, Arc<std::sync::atomic::AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::spawn(async move {
                        // Hold the connection open without answering.
                        let _socket = socket;
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, accepted)
}

/// Read the request head so the backend does not respond before the
/// gateway has finished writing.
async fn drain_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = [0u8; 4096];
    let mut head = Vec::new();
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

/// A cache probe with a fixed verdict, so tests do not need a live redis.
pub struct StubCache {
    pub healthy: bool,
}

#[async_trait]
impl CacheProbe for StubCache {
    async fn probe(&self, _timeout: Duration) -> Result<(), String> {
        if self.healthy {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// Build a config with the given routes and rate limits loose enough to
/// stay out of the way unless a test tightens them.
pub fn test_config(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes = routes;
    config.rate_limit.window_secs = 60;
    config.rate_limit.max_requests = 10_000;
    config.health.probe_ceiling_secs = 1;
    config
}

/// A route pointing at a local mock backend, with fast failure settings.
pub fn route_to(prefix: &str, service: &str, addr: SocketAddr) -> RouteConfig {
    RouteConfig {
        prefix: prefix.to_string(),
        service: service.to_string(),
        target: format!("http://{}", addr),
        timeout_secs: 1,
        max_retries: 0,
        require_auth: false,
        rate_limit: None,
    }
}

/// Spawn a gateway on an ephemeral port and return its address plus the
/// shutdown handle that keeps it alive.
pub async fn start_gateway(config: GatewayConfig, cache: Arc<dyn CacheProbe>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config, cache, &shutdown).unwrap();
    let server_rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_rx).await;
    });

    (addr, shutdown)
}

/// A non-pooled client so each request opens a fresh connection.
#[allow(dead_code)]
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
