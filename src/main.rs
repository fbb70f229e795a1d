mod config;
mod dto;
mod handlers;
mod models;
mod repository;
mod service;

use std::{process::ExitCode, sync::Arc};

use tracing_subscriber::EnvFilter;

use handlers::console;
use repository::RestRepository;
use service::NoteService;

#[tokio::main]
async fn main() -> ExitCode {
    // Log setup, stderr keeps stdout for the console views
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to locate or load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Successfully loaded notes client config");

    // Remote API
    let repo = match RestRepository::new(&cfg.api_base_url, cfg.request_timeout) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (service, saves) = NoteService::new(Arc::new(repo), &cfg);

    tracing::info!("Using notes API at {}", cfg.api_base_url);

    if let Err(e) = console::run(service, saves, &cfg).await {
        tracing::error!("Console error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
