mod config;
mod error;
mod extractor;
mod handlers;
mod llm;
mod metrics;
mod prompt;
mod routes;
mod sandbox;

use anyhow::Context;
use axum::Router;
use promptrun_common::languages::LanguageTable;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use config::{AppConfig, ModelConfig};
use llm::{CompletionClient, OpenAiCompatibleClient};
use sandbox::{ExecutionClient, Judge0Client};

#[derive(Clone)]
pub struct AppState {
    pub languages: LanguageTable,
    pub llm: Arc<dyn CompletionClient>,
    pub sandbox: Arc<dyn ExecutionClient>,
    pub model: ModelConfig,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables win
    let dotenv = dotenvy::dotenv();

    init_tracing();

    info!("promptrun API booting...");
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env file");
        }
    }

    let config = AppConfig::from_env().map_err(|e| {
        error!("{}", e);
        e
    })?;

    let languages = match &config.languages_path {
        Some(path) => LanguageTable::load_from_file(path)
            .with_context(|| format!("Failed to load languages from {}", path.display()))?,
        None => LanguageTable::builtin(),
    };

    info!("Loaded language profiles: {:?}", languages.keys());
    info!(
        model = %config.llm.model.model,
        max_tokens = config.llm.model.max_tokens,
        temperature = config.llm.model.temperature,
        llm_url = %config.llm.base_url,
        judge0_url = %config.judge0.base_url,
        "Upstreams configured"
    );

    metrics::init();

    let state = Arc::new(AppState {
        languages,
        llm: Arc::new(OpenAiCompatibleClient::new(&config.llm)),
        sandbox: Arc::new(Judge0Client::new(&config.judge0)),
        model: config.llm.model.clone(),
    });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight requests...");
}
