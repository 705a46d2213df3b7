//! HTTP server lifecycle.

use super::{
    middleware::{create_middleware_stack, create_trace_layer, request_logger},
    routes::create_router,
    AppState,
};
use crate::app::AppContext;
use crate::commands::cli::ServeArgs;
use axum::middleware;
use jobwatch_core::api::CliError;
use std::net::SocketAddr;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// `jobwatch serve`
pub async fn handle_serve(args: ServeArgs, ctx: &AppContext) -> Result<(), CliError> {
    let session_id = Uuid::new_v4().to_string();

    // CLI flags win over the config file.
    let config = ServerConfig {
        host: args
            .host
            .unwrap_or_else(|| ctx.cfg().http_server.host.clone()),
        port: args.port.unwrap_or(ctx.cfg().http_server.port),
    };

    let store = ctx.build_store().await?;
    let launcher = ctx.build_launcher(store.clone())?;
    let reader = ctx.build_reader(store);

    let (shutdown_tx, _) = broadcast::channel(1);
    let state = AppState::new(
        session_id.clone(),
        ctx.cfg().clone(),
        launcher,
        reader,
        shutdown_tx,
    );

    start_server_with_config(session_id, config, state)
        .await
        .map_err(|e: Box<dyn std::error::Error + Send + Sync>| CliError::Command(e.to_string()))
}

pub async fn start_server_with_config(
    session_id: String,
    config: ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(
        "Starting HTTP server on {}:{} (session: {})",
        config.host, config.port, session_id
    );

    let app = create_router(state.clone())
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack())
        .layer(create_trace_layer());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    let mut shutdown_rx = state.shutdown_tx.subscribe();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal from API");
                }
                _ = wait_for_sigterm() => {
                    info!("Received SIGTERM signal");
                }
            }

            info!("Starting graceful shutdown...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await
        }
    }
}

/// No SIGTERM on this platform; Ctrl+C or the shutdown API stop the server.
#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
