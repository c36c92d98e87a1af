//! Application layer - Services that drive the ports.

pub mod generation;
pub mod relocation;
pub mod videos;
pub mod webhook;
pub mod worker;

use crate::domain::jobs::DEFAULT_RETRIES;
use crate::ports::fetch::FetchPort;
use crate::ports::generation::{ImageGenerationPort, TextGenerationPort};
use crate::ports::media::MediaProviderPort;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use generation::GenerationService;
use relocation::AssetRelocator;
use std::sync::Arc;
use videos::VideoService;
use webhook::WebhookService;
use worker::WorkerService;

/// Every adapter a deployment wires in.
#[derive(Clone)]
pub struct Ports {
    pub repo: Arc<dyn VideoRepository>,
    pub storage: Arc<dyn StoragePort>,
    pub queue: Arc<dyn JobQueuePort>,
    pub fetcher: Arc<dyn FetchPort>,
    pub media: Arc<dyn MediaProviderPort>,
    pub text: Arc<dyn TextGenerationPort>,
    pub image: Arc<dyn ImageGenerationPort>,
}

/// Services built over one set of ports.
#[derive(Clone)]
pub struct Services {
    pub webhooks: Arc<WebhookService>,
    pub videos: Arc<VideoService>,
    pub generation: Arc<GenerationService>,
    pub queue: Arc<dyn JobQueuePort>,
}

impl Services {
    pub fn new(ports: Ports) -> Self {
        Self::with_retries(ports, DEFAULT_RETRIES)
    }

    pub fn with_retries(ports: Ports, retries: u32) -> Self {
        let relocator = AssetRelocator::new(ports.storage.clone(), ports.fetcher.clone());
        Self {
            webhooks: Arc::new(WebhookService::new(ports.repo.clone(), relocator.clone())),
            videos: Arc::new(VideoService::new(
                ports.repo.clone(),
                ports.media,
                ports.queue.clone(),
                relocator.clone(),
                retries,
            )),
            generation: Arc::new(GenerationService::new(
                ports.repo,
                ports.fetcher,
                ports.text,
                ports.image,
                relocator,
            )),
            queue: ports.queue,
        }
    }

    pub fn worker(&self) -> WorkerService {
        WorkerService::new(self.queue.clone(), self.generation.clone())
    }
}
