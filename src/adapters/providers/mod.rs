//! Outbound HTTP clients for third-party services.

pub mod error;
pub mod fetch;
pub mod gemini;
pub mod imagine;
pub mod mux;

pub use error::ProviderError;
pub use fetch::HttpFetcher;
pub use gemini::GeminiClient;
pub use imagine::ImagineClient;
pub use mux::MuxClient;

use crate::application::Ports;
use crate::config::AppConfig;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use std::sync::Arc;

/// Complete a deployment's ports with the HTTP clients, which all share one
/// connection pool.
pub fn wire(
    config: &AppConfig,
    repo: Arc<dyn VideoRepository>,
    storage: Arc<dyn StoragePort>,
    queue: Arc<dyn JobQueuePort>,
) -> Ports {
    let client = reqwest::Client::new();
    Ports {
        repo,
        storage,
        queue,
        fetcher: Arc::new(HttpFetcher::with_client(client.clone())),
        media: Arc::new(MuxClient::with_client(
            client.clone(),
            mux::DEFAULT_API_URL.to_string(),
            config.mux_token_id.clone(),
            config.mux_token_secret.clone(),
        )),
        text: Arc::new(
            GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())
                .with_client(client.clone()),
        ),
        image: Arc::new(ImagineClient::new(config.imagine_api_key.clone()).with_client(client)),
    }
}
