//! Router assembly and the HTTP server loop

use crate::handler::{analyze, health, metrics, root};
use crate::pipeline::{log_requests, track_metrics, translate_errors};
use crate::state::AppState;
use crate::{Result, ServerError};

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use senti_core::Settings;
use std::net::SocketAddr;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Build the application router with the full request pipeline
pub fn create_router(state: AppState) -> Router {
    let limits = *state.limits();

    // Layers wrap what is already there, so the last one added runs first
    let mut router: Router<AppState> = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/analyze", post(analyze))
        .route("/api/v1/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(limits.max_request_size))
        .layer(from_fn(translate_errors))
        .layer(CatchPanicLayer::new());

    // Preflights answered here still pass through metrics and logging
    if state.settings.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(from_fn_with_state(state.clone(), track_metrics))
        .layer(from_fn(log_requests))
        .with_state(state)
}

/// Serve until a shutdown signal arrives
pub async fn serve(settings: Settings) -> Result<()> {
    let addr: SocketAddr = settings
        .server
        .bind_address()
        .parse()
        .map_err(|e| ServerError::Configuration(format!("Invalid bind address: {}", e)))?;

    info!(
        app = %settings.app_name,
        version = %settings.app_version,
        model = %settings.model.name,
        backend = ?settings.model.backend,
        "Starting service"
    );

    let state = AppState::new(settings)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| {
        error!("HTTP server error: {}", e);
        ServerError::Server(format!("HTTP server failed: {}", e))
    })?;

    info!("Service stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
