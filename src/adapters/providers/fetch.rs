use super::error::ProviderError;
use crate::ports::fetch::FetchPort;
use crate::ports::BoxError;
use async_trait::async_trait;
use bytes::Bytes;

/// Plain GET fetcher for provider-hosted images and transcripts.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchPort for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, BoxError> {
        let response = self.client.get(url).send().await.map_err(ProviderError::from)?;
        let response = ProviderError::check("fetch", response).await?;
        Ok(response.bytes().await.map_err(ProviderError::from)?)
    }
}
