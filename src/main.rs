mod config;
mod domain;
mod error;
mod middleware;
mod services;
mod state;
mod web;

use crate::config::Config;
use crate::state::{AppState, SharedState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let vision = services::ai::build_vision_model(&config.ai);
    match &vision {
        Some(model) => tracing::info!(
            "AI service initialized: provider={}, model={}",
            model.provider(),
            config.ai.model
        ),
        None => tracing::warn!(
            "No API key for AI provider '{}'; food analysis will answer 500 until one is configured",
            config.ai.provider.name()
        ),
    }
    if let Some(timeout) = config.ai.timeout {
        tracing::info!("AI request timeout: {}s", timeout.as_secs());
    }

    let addr = config.bind_addr.clone();
    let shared: SharedState = Arc::new(AppState { config, vision });
    let app = web::app(shared);

    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
