//! REST client for the Mux Video API.

use super::error::ProviderError;
use crate::domain::events::PlaybackId;
use crate::domain::media::{AssetTrack, DirectUpload, ProviderAsset, TRANSCRIPT_LANGUAGE};
use crate::domain::video::{lenient_status, VideoStatus};
use crate::ports::media::MediaProviderPort;
use crate::ports::BoxError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub const DEFAULT_API_URL: &str = "https://api.mux.com";

const SERVICE: &str = "mux";

pub struct MuxClient {
    client: reqwest::Client,
    api_url: String,
    token_id: String,
    token_secret: String,
}

/// Every Mux response wraps its resource in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AssetBody {
    id: String,
    #[serde(default, deserialize_with = "lenient_status")]
    status: Option<VideoStatus>,
    duration: Option<f64>,
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    tracks: Vec<AssetTrack>,
}

impl From<AssetBody> for ProviderAsset {
    fn from(body: AssetBody) -> Self {
        ProviderAsset {
            id: body.id,
            status: body.status,
            duration: body.duration,
            playback_ids: body.playback_ids.into_iter().map(|p| p.id).collect(),
            tracks: body.tracks,
        }
    }
}

impl MuxClient {
    pub fn new(token_id: String, token_secret: String) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            DEFAULT_API_URL.to_string(),
            token_id,
            token_secret,
        )
    }

    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        token_id: String,
        token_secret: String,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_id,
            token_secret,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/video/v1/{}", self.api_url, path)
    }

    /// GET a resource, mapping 404 to `None`.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ProviderError> {
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ProviderError::check(SERVICE, response).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(Some(envelope.data))
    }
}

/// Settings for a new direct upload: the owner rides along as passthrough,
/// playback is public and English subtitles are generated for transcripts.
fn upload_request(owner_id: Uuid) -> serde_json::Value {
    json!({
        "cors_origin": "*",
        "new_asset_settings": {
            "passthrough": owner_id.to_string(),
            "playback_policy": ["public"],
            "input": [{
                "generated_subtitles": [{
                    "language_code": TRANSCRIPT_LANGUAGE,
                    "name": "English"
                }]
            }]
        }
    })
}

#[async_trait]
impl MediaProviderPort for MuxClient {
    async fn create_upload(&self, owner_id: Uuid) -> Result<DirectUpload, BoxError> {
        let response = self
            .client
            .post(self.url("uploads"))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&upload_request(owner_id))
            .send()
            .await
            .map_err(ProviderError::from)?;
        let response = ProviderError::check(SERVICE, response).await?;
        let envelope: Envelope<DirectUpload> =
            response.json().await.map_err(ProviderError::from)?;
        Ok(envelope.data)
    }

    async fn retrieve_upload(&self, upload_id: &str) -> Result<Option<DirectUpload>, BoxError> {
        Ok(self.get(&format!("uploads/{}", upload_id)).await?)
    }

    async fn retrieve_asset(&self, asset_id: &str) -> Result<Option<ProviderAsset>, BoxError> {
        let asset: Option<AssetBody> = self.get(&format!("assets/{}", asset_id)).await?;
        Ok(asset.map(ProviderAsset::from))
    }
}
