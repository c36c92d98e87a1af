use super::BoxError;
use async_trait::async_trait;
use bytes::Bytes;

/// Downloads publicly reachable provider resources (images, transcripts).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchPort: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, BoxError>;
}
