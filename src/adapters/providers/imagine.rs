//! Image generation over the Imagine (vyro.ai) API.

use super::error::ProviderError;
use crate::ports::generation::{GeneratedImage, ImageGenerationPort};
use crate::ports::BoxError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

pub const DEFAULT_API_URL: &str = "https://api.vyro.ai/v2/image/generations";

const SERVICE: &str = "imagine";
const STYLE: &str = "realistic";
const ASPECT_RATIO: &str = "16:9";
const FALLBACK_CONTENT_TYPE: &str = "image/png";

pub struct ImagineClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ImagineClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }
}

/// The response's own type when it names an image, else PNG.
fn image_content_type(header: Option<&str>) -> String {
    header
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|value| value.starts_with("image/"))
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

#[async_trait]
impl ImageGenerationPort for ImagineClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, BoxError> {
        let form = [
            ("prompt", prompt),
            ("style", STYLE),
            ("aspect_ratio", ASPECT_RATIO),
        ];

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(ProviderError::from)?;
        let response = ProviderError::check(SERVICE, response).await?;

        let content_type = image_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        let bytes = response.bytes().await.map_err(ProviderError::from)?;
        if bytes.is_empty() {
            return Err(ProviderError::Empty { service: SERVICE }.into());
        }

        Ok(GeneratedImage {
            bytes,
            content_type,
        })
    }
}
