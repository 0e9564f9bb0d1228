//! OCR Bridge Server
//!
//! Accepts image and PDF uploads, runs them through an external OCR engine,
//! and returns normalized, paginated results as JSON.

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_bridge::config::Config;
use ocr_bridge::ocr::{CommandEngine, EngineState, OcrService};
use ocr_bridge::routes;
use ocr_bridge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_bridge=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting OCR Bridge v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Engine command: {}", config.engine.command);
    tracing::info!("Temporary files: {}", config.temp_dir.display());

    // Initialize the engine; the server starts even if it is unavailable
    let engine_config = config.engine.clone();
    let engine = EngineState::initialize(config.engine.max_concurrent, |profile| {
        let engine_config = engine_config.clone();
        async move { CommandEngine::start(&engine_config, profile).await }
    })
    .await;

    if !engine.is_ready() {
        tracing::warn!("OCR engine is not available, /ocr will answer 503");
    }

    let service = OcrService::new(engine, config.engine.name.clone(), config.temp_dir.clone());
    let app_state = AppState::new(config.clone(), service);
    let app = routes::app(app_state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("OCR Bridge listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
