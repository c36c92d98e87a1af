use super::BoxError;
use async_trait::async_trait;
use bytes::Bytes;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerationPort: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, BoxError>;
}

/// Image bytes and their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerationPort: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, BoxError>;
}
