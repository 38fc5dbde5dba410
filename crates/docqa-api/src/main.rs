//! DocQA API Server
//!
//! Builds the document index, then serves queries over HTTP.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::Parser;
use docqa_api::{create_router, init_tracing, state::AppState};
use docqa_core::AppConfig;
use docqa_rag::IndexProvider;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docqa-api")]
#[command(about = "Question answering over a directory of documents")]
#[command(version)]
struct Args {
    /// TOML configuration file; environment variables override its values
    #[arg(long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    }
    .with_env_override()?;

    init_tracing(&config.logging);

    // Build the index before accepting connections
    let provider = Arc::new(IndexProvider::from_config(config.clone()));
    provider
        .initialize()
        .await
        .context("Failed to initialize index")?;

    let state = Arc::new(AppState::new(config.clone(), provider.clone()));
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("DocQA API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    provider.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
