mod ai_client;
mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod matching;
mod messaging;
mod models;
mod networking;
mod pagination;
mod payments;
mod posts;
mod routes;
mod state;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::matching::extraction::SkillExtractor;
use crate::matching::fit::{HeuristicJobMatcher, Matchers, RemoteJobMatcher};
use crate::matching::placeholder::placeholder_source;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Job Board API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Heuristic matcher is always available
    let heuristic = Arc::new(HeuristicJobMatcher::new(
        config.match_strategy,
        placeholder_source(config.placeholder_mode, config.placeholder_seed),
    ));
    info!(
        "Heuristic matcher initialized (strategy: {}, placeholders: {:?})",
        config.match_strategy, config.placeholder_mode
    );

    // Remote matcher only when an API key is configured
    let remote = match &config.ai_api_key {
        Some(key) => {
            let client = AiClient::new(
                config.ai_endpoint.clone(),
                key.clone(),
                config.ai_model.clone(),
            )?;
            info!("Remote matcher initialized (model: {})", client.model());
            Some(Arc::new(RemoteJobMatcher::new(client, heuristic.clone())))
        }
        None => {
            info!("AI_API_KEY not set; remote matching requests use the heuristic");
            None
        }
    };

    let state = AppState {
        db,
        matchers: Matchers::new(heuristic, remote),
        extractor: SkillExtractor::new(config.skill_extraction_fallback),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins via config before deploying publicly

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
