//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use health_checker::config::HealthCheckerConfig;
use health_checker::http::HttpServer;
use health_checker::lifecycle::Shutdown;
use health_checker::net::Listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock backend that answers every request with `status` and `body`.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = if status == 204 {
                            format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status_text)
                        } else {
                            format!(
                                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status_text,
                                body.len(),
                                body
                            )
                        };
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A port on 127.0.0.1 with nothing listening on it.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

/// Start the health checker on an ephemeral port.
///
/// The returned `Shutdown` must be kept alive for as long as the server is used.
pub async fn spawn_server(mut config: HealthCheckerConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.drain_secs = 1;

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(Arc::new(config));
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// An HTTP client that never goes through a proxy and never reuses connections.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
