//! Prometheus metrics for routed requests.
//!
//! Request binding and descriptor caching are instrumented in `route-bind-core`; this module
//! adds per-handler request counters and an HTTP exporter.
//!
//! # Example
//!
//! ```no_run
//! use route_bind_web::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! tokio::spawn(server.serve());
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use axum::{Router, http::StatusCode, routing::get};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Requests answered by an endpoint.
pub const REQUESTS_HANDLED: &str = "requests_handled_total";
/// Time spent serving requests.
pub const REQUEST_DURATION: &str = "request_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
    /// The server was asked to serve before `start`
    #[error("Metrics server has not been started")]
    NotStarted,
    /// Failed to bind HTTP server
    #[error("Failed to bind metrics server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` (e.g. `0.0.0.0:9090`).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder that is
    /// already installed (as in tests) is tolerated with a warning.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        describe_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }

    /// Axum router answering `GET /metrics`.
    #[must_use]
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move {
                    match handle {
                        Some(handle) => (StatusCode::OK, handle.render()),
                        None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
                    }
                }
            }),
        )
    }

    /// Serve `/metrics` until the process stops.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::NotStarted`] before [`start`](Self::start), or
    /// [`MetricsError::Bind`] when the address cannot be bound.
    pub async fn serve(self) -> Result<(), MetricsError> {
        if self.handle.is_none() {
            return Err(MetricsError::NotStarted);
        }
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// Register descriptions for every metric the workspace emits.
pub fn describe_metrics() {
    route_bind_core::metrics::describe_metrics();
    describe_counter!(
        REQUESTS_HANDLED,
        "Total number of requests answered, by handler and status"
    );
    describe_histogram!(REQUEST_DURATION, "Time taken to serve a request");
}

/// Request metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record one answered request.
    pub fn record(handler: &'static str, status: StatusCode) {
        counter!(
            REQUESTS_HANDLED,
            "handler" => handler,
            "status" => status.as_str().to_string()
        )
        .increment(1);
    }

    /// Record how long a request took.
    pub fn record_duration(handler: &'static str, duration: Duration) {
        histogram!(REQUEST_DURATION, "handler" => handler).record(duration.as_secs_f64());
    }
}
