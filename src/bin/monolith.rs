//! Monolith Binary - Local deployment
//!
//! This is the main entry point for local development and single-server deployment.
//! It wires up:
//! - Local adapters (filesystem storage, Redis records and workflow queue)
//! - Provider clients (Mux, Gemini, Imagine)
//! - The HTTP API, plus the stored media under `/media`
//! - In-process generation workers draining the Redis queue

use std::sync::Arc;
use tower_http::services::ServeDir;
use vidhub::adapters::local::{FsStorage, RedisPool};
use vidhub::adapters::providers;
use vidhub::domain::signature::WebhookVerifier;
use vidhub::{router, telemetry, AppConfig, AppState, LocalConfig, Services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let config = AppConfig::from_env()?;
    let local = LocalConfig::from_env()?;

    // 1. Adapters (Local implementations)
    let redis = RedisPool::new(&local.redis_url)?;
    tokio::fs::create_dir_all(&local.media_dir).await?;
    let storage = FsStorage::new(&local.media_dir, format!("{}/media", config.public_url));

    // 2. Application Services
    let ports = providers::wire(
        &config,
        Arc::new(redis.clone()),
        Arc::new(storage),
        Arc::new(redis),
    );
    let services = Services::with_retries(ports, config.workflow_retries);

    // 3. Start Workers
    for i in 0..local.workers {
        let worker = services.worker();
        tokio::spawn(async move {
            worker.run_worker_loop(i).await;
        });
    }
    tracing::info!(workers = local.workers, "started generation workers");

    // 4. HTTP Layer
    let verifier = WebhookVerifier::new(&config.mux_webhook_secret)
        .with_tolerance(config.webhook_tolerance_secs);
    let state =
        AppState::new(services, verifier).with_workflow_token(&config.workflow_token);
    let app = router(state).nest_service("/media", ServeDir::new(&local.media_dir));

    // 5. Start Server
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
