//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health handler on every path
//! - Wire up middleware (tracing)
//! - Accept connections and serve HTTP/1.1 and HTTP/2 on them
//! - Surface per-connection serve/write errors
//! - Drain open connections on shutdown

use axum::{
    extract::State,
    http::Uri,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::HealthCheckerConfig;
use crate::health::{RunCoalescer, Runner};
use crate::http::response;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coalescer: Arc<RunCoalescer>,
}

/// HTTP front end reporting the aggregate health of the configured checks.
pub struct HttpServer {
    router: Router,
    config: Arc<HealthCheckerConfig>,
    coalescer: Arc<RunCoalescer>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: Arc<HealthCheckerConfig>) -> Self {
        let runner = Arc::new(Runner::new(config.checks(), config.check_timeouts()));
        let coalescer = Arc::new(RunCoalescer::new(runner, config.listener.singleflight));

        let state = AppState {
            coalescer: Arc::clone(&coalescer),
        };
        let router = Self::build_router(state);

        Self {
            router,
            config,
            coalescer,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(health_handler))
            .route("/{*path}", any(health_handler))
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn coalescer(&self) -> &Arc<RunCoalescer> {
        &self.coalescer
    }

    pub fn config(&self) -> &HealthCheckerConfig {
        &self.config
    }

    /// Serve connections until a shutdown signal arrives, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                checks = self.coalescer.runner().checks().len(),
                singleflight = self.coalescer.is_enabled(),
                "HTTP server starting"
            );
        }

        let tracker = ConnectionTracker::new();
        let builder = auto::Builder::new(TokioExecutor::new());

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer_addr, permit) = match accepted {
                        Ok(connection) => connection,
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    let guard = tracker.track();
                    let mut draining = tracker.drain_signal();
                    let service = TowerToHyperService::new(self.router.clone());
                    let builder = builder.clone();

                    tokio::spawn(async move {
                        let _permit = permit;
                        let connection = builder.serve_connection(TokioIo::new(stream), service);
                        tokio::pin!(connection);

                        let served = tokio::select! {
                            served = connection.as_mut() => served,
                            _ = draining.changed() => {
                                connection.as_mut().graceful_shutdown();
                                connection.await
                            }
                        };

                        if let Err(e) = served {
                            metrics::record_connection_error();
                            tracing::error!(
                                connection_id = %guard.id(),
                                peer_addr = %peer_addr,
                                error = %e,
                                "Failed to send HTTP response"
                            );
                        }
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("HTTP server received shutdown signal, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        tracker.begin_drain();
        let drain_timeout = Duration::from_secs(self.config.timeouts.drain_secs);
        if time::timeout(drain_timeout, tracker.wait_for_drain()).await.is_err() {
            tracing::warn!(
                open_connections = tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Runs (or joins) a health check run and reports its verdict.
async fn health_handler(State(state): State<AppState>, uri: Uri) -> Response {
    tracing::info!(path = %uri.path(), "Received inbound request. Beginning health checks...");

    let result = state.coalescer.invoke().await;
    response::log_outcomes(&result);
    response::from_run(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{ScriptCheck, TcpCheck};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config_with_script(body: &str) -> HealthCheckerConfig {
        let mut config = HealthCheckerConfig::default();
        config
            .script
            .push(ScriptCheck::new("script", "sh").with_args(["-c", body]));
        config
    }

    async fn call(server: &HttpServer, path: &str) -> (StatusCode, String) {
        let response = server
            .router()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn passing_checks_return_ok() {
        let server = HttpServer::new(Arc::new(config_with_script("exit 0")));
        let (status, body) = call(&server, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn failing_check_returns_gateway_timeout() {
        let server = HttpServer::new(Arc::new(config_with_script("exit 1")));
        let (status, body) = call(&server, "/").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body, "At least one health check failed");
    }

    #[tokio::test]
    async fn any_path_runs_the_checks() {
        let server = HttpServer::new(Arc::new(config_with_script("exit 0")));
        let (status, _) = call(&server, "/healthz/deep").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(server.coalescer().runner().runs_started(), 1);
    }

    #[tokio::test]
    async fn each_request_reruns_checks() {
        let mut config = config_with_script("exit 0");
        config.tcp.push(TcpCheck::new("dead", "127.0.0.1", {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        }));
        let server = HttpServer::new(Arc::new(config));

        for _ in 0..3 {
            let (status, _) = call(&server, "/").await;
            assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        }
        assert_eq!(server.coalescer().runner().runs_started(), 3);
    }
}
