use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ftclaw_pipeline::api::{router, AppState};
use ftclaw_pipeline::config::ServerConfig;
use ftclaw_pipeline::coordinator::spawn_coordinator;
use ftclaw_pipeline::services::LiveServices;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&config.output_dir).await {
        tracing::error!(error = %e, output_dir = %config.output_dir.display(), "failed to create output directory");
        std::process::exit(1);
    }

    let addr = config.bind_addr;
    let static_dir = config.static_dir.clone();
    let app_state = AppState {
        coordinator: spawn_coordinator(config.clone(), Arc::new(LiveServices::new(config.clone()))),
        output_dir: config.output_dir.clone(),
        allow_pdf_target_dir: config.allow_pdf_target_dir,
    };
    let app = router(app_state, static_dir);

    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to bind on {addr}");
            std::process::exit(1);
        });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("received SIGINT, shutting down");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
