// Currency Grid - Web Server
// REST API with Axum over the built-in currency dataset

use anyhow::{Context, Result};
use currency_grid::server::{create_router, AppState, API_PREFIX};
use currency_grid::{config, init_logging, CurrencyDataset, ServerConfig};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    init_logging("info,tower_http=debug");

    let config = ServerConfig::from_env()?;

    info!("💱 Currency Grid - Web Server v{}", currency_grid::VERSION);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let dataset = CurrencyDataset::canonical();
    info!("✓ Dataset loaded: {} records", dataset.len());

    let app = create_router(AppState::new(dataset), &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("🚀 Server running on http://{}", addr);
    info!("   Test endpoint: http://{}/test", addr);
    info!("   API endpoint:  http://{}{}", addr, API_PREFIX);
    info!("   CORS origins:  {}", config.allowed_origins.join(", "));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
