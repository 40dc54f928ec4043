mod config;
mod documents;
mod errors;
mod llm_client;
mod routes;
mod state;
mod tasks;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{CredentialPool, FailoverController, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::tasks::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails when no API key is configured)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EduPro API v{}", env!("CARGO_PKG_VERSION"));

    // One pool for the whole process; every request rotates the same index
    let pool = Arc::new(CredentialPool::new(config.api_keys.clone())?);
    info!("Credential pool initialized ({} key(s))", pool.len());

    let llm = Arc::new(LlmClient::new()?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let orchestrator = Orchestrator::new(FailoverController::new(llm, pool));
    let state = AppState::new(orchestrator);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
