//! Gateway process entry point: load configuration, install the tracing
//! subscriber, build the router, and serve until a termination signal asks
//! for graceful shutdown.

mod app;
mod config;
mod error_response;
mod extractors;
mod llm;
mod middleware;
mod rate_limit;
mod request_context;
mod routes;
mod session_scope;
mod state;
mod tenant;

use config::GatewayConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = GatewayConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("gateway shutdown complete");
    Ok(())
}

/// Waits for SIGTERM or Ctrl-C. Once received, `axum::serve` stops
/// accepting new connections but lets in-flight requests — including chat
/// streams running their teardown hook — finish on their own.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received sigterm, shutting down"),
    }
}
