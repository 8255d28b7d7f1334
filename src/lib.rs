//! Lab relay — HTTP entry point.
//!
//! This is the shell that wires together all domains. No business logic
//! lives here — only module declarations, env/config loading, logger
//! setup and the server loop.
//!
//! Domains:
//!   - input.rs    — text vs upload resolution
//!   - ocr/        — external OCR service client
//!   - llm/        — prompts, Gemini client, output sanitizer
//!   - pipeline.rs — per-request orchestration
//!   - server.rs   — axum router + CORS

pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod server;
pub mod upload;

use config::AppConfig;
use pipeline::Analyzer;
use server::AppState;

/// Entry point — called by `main`.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env.local → .env from the working directory; first one wins.
    'env_load: for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }

    env_logger::init();

    let config = AppConfig::from_env()?;
    log::info!("Lab relay starting up");
    match config.gemini_api_key.as_deref() {
        Some(key) => log::info!("[STARTUP] GEMINI_API_KEY found ({} chars)", key.len()),
        None => log::warn!(
            "[STARTUP] No GEMINI_API_KEY set — /analyze-report will fail until it is configured"
        ),
    }
    log::info!("[STARTUP] OCR service: {} (timeout {:?})", config.ocr_url, config.ocr_timeout);
    log::info!(
        "[STARTUP] Gemini model: {} (timeout {:?})",
        config.gemini_model,
        config.completion_timeout
    );
    log::info!("[STARTUP] Allowed origins: {}", config.allowed_origins.join(", "));

    let analyzer = Analyzer::from_config(&config)?;
    let app = server::build_router(AppState::new(analyzer), &config);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("[SERVER] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("[SERVER] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[SERVER] Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("[SERVER] Ctrl+C received, draining requests");
}
