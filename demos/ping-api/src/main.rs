//! Ping API HTTP server.
//!
//! Environment:
//!
//! - `PING_API_ADDR`: listen address (default `0.0.0.0:8080`)
//! - `METRICS_ADDR`: Prometheus address (default `0.0.0.0:9090`)
//! - `ENVIRONMENT`, `ROUTER_LOGGING`, `ROUTER_BODY_LIMIT`: see `RouterConfig`

use anyhow::Context;
use route_bind_web::{MetricsServer, RouterConfig};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn addr_from_env(name: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse().with_context(|| format!("{name} is not a socket address: {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ping_api=info,route_bind_web=debug,route_bind_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RouterConfig::from_env()?;
    let addr = addr_from_env("PING_API_ADDR", "0.0.0.0:8080")?;
    let metrics_addr = addr_from_env("METRICS_ADDR", "0.0.0.0:9090")?;

    let mut metrics = MetricsServer::new(metrics_addr);
    metrics.start()?;
    tokio::spawn(async move {
        if let Err(error) = metrics.serve().await {
            tracing::error!(%error, "Metrics server stopped");
        }
    });

    let router = ping_api::router(config)?;
    for route in router.routes() {
        info!(method = %route.method, path = %route.path, handler = %route.handler, "Route");
    }
    let app = router.into_axum();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Ping API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
