//! Reconciles media provider events with the stored video records.

use super::relocation::{AssetRelocator, RelocationError};
use crate::domain::events::{AssetData, TrackData, WebhookEvent};
use crate::domain::media;
use crate::domain::video::{VideoPatch, VideoRecord, VideoStatus};
use crate::ports::repository::VideoRepository;
use crate::ports::BoxError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing upload ID")]
    MissingUploadId,
    #[error("Missing asset ID")]
    MissingAssetId,
    #[error("Missing playback ID")]
    MissingPlaybackId,
    #[error("Unknown Video ID")]
    UnknownVideo,
    #[error("Failed to upload thumbnail or preview")]
    Relocation(#[from] RelocationError),
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<BoxError> for WebhookError {
    fn from(err: BoxError) -> Self {
        WebhookError::Repository(err.to_string())
    }
}

pub struct WebhookService {
    repo: Arc<dyn VideoRepository>,
    relocator: AssetRelocator,
}

impl WebhookService {
    pub fn new(repo: Arc<dyn VideoRepository>, relocator: AssetRelocator) -> Self {
        Self { repo, relocator }
    }

    pub async fn handle(&self, event: WebhookEvent) -> Result<(), WebhookError> {
        match event {
            WebhookEvent::AssetCreated(data) => self.asset_created(data).await,
            WebhookEvent::AssetReady(data) => self.asset_ready(data).await,
            WebhookEvent::AssetErrored(data) => self.asset_errored(data).await,
            WebhookEvent::AssetDeleted(data) => self.asset_deleted(data).await,
            WebhookEvent::TrackReady(data) => self.track_changed(data, None).await,
            WebhookEvent::TrackErrored(data) => self.track_changed(data, Some("errored")).await,
            WebhookEvent::Unrecognized(kind) => {
                debug!(kind = %kind, "ignoring unrecognized webhook event");
                Ok(())
            }
        }
    }

    async fn asset_created(&self, data: AssetData) -> Result<(), WebhookError> {
        let upload_id = data.upload_id.as_deref().ok_or(WebhookError::MissingUploadId)?;
        let patch = VideoPatch {
            asset_id: data.id.clone().map(Some),
            status: data.status,
            ..Default::default()
        };
        self.update_upload(upload_id, &patch).await
    }

    async fn asset_errored(&self, data: AssetData) -> Result<(), WebhookError> {
        let upload_id = data.upload_id.as_deref().ok_or(WebhookError::MissingUploadId)?;
        let patch = VideoPatch {
            status: data.status,
            ..Default::default()
        };
        self.update_upload(upload_id, &patch).await
    }

    async fn asset_ready(&self, data: AssetData) -> Result<(), WebhookError> {
        let upload_id = data.upload_id.as_deref().ok_or(WebhookError::MissingUploadId)?;
        let playback_id = data
            .first_playback_id()
            .ok_or(WebhookError::MissingPlaybackId)?;

        let existing = self
            .repo
            .find_by_upload_id(upload_id)
            .await?
            .ok_or(WebhookError::UnknownVideo)?;
        log_transition(&existing, data.status);

        self.relocator.discard(&existing.owned_keys()).await;
        let (thumbnail, preview) = self
            .relocator
            .relocate_pair(
                &media::thumbnail_url(playback_id),
                &media::preview_url(playback_id),
            )
            .await?;
        let relocated = vec![thumbnail.key.clone(), preview.key.clone()];

        let patch = VideoPatch {
            status: data.status,
            playback_id: Some(Some(playback_id.to_string())),
            asset_id: data.id.clone().map(Some),
            duration_ms: Some(data.duration_ms()),
            thumbnail: Some(Some(thumbnail)),
            preview: Some(Some(preview)),
            ..Default::default()
        };

        match self.repo.update_by_upload_id(upload_id, &patch).await {
            Ok(Some(record)) => {
                info!(video_id = %record.id, upload_id, playback_id, "video ready");
                Ok(())
            }
            Ok(None) => {
                // Record removed while relocating.
                self.relocator.discard(&relocated).await;
                Err(WebhookError::UnknownVideo)
            }
            Err(e) => {
                self.relocator.discard(&relocated).await;
                Err(e.into())
            }
        }
    }

    async fn asset_deleted(&self, data: AssetData) -> Result<(), WebhookError> {
        let upload_id = data.upload_id.as_deref().ok_or(WebhookError::MissingUploadId)?;
        let Some(existing) = self.repo.find_by_upload_id(upload_id).await? else {
            info!(upload_id, "asset deleted for unknown upload");
            return Ok(());
        };

        if self.relocator.discard(&existing.owned_keys()).await {
            self.repo.delete_by_upload_id(upload_id).await?;
            info!(video_id = %existing.id, upload_id, "video removed after asset deletion");
        } else {
            let patch = VideoPatch {
                status: Some(VideoStatus::Deleted),
                upload_id: Some(None),
                asset_id: Some(None),
                ..Default::default()
            };
            self.repo.update_by_upload_id(upload_id, &patch).await?;
            warn!(
                video_id = %existing.id,
                upload_id,
                "storage cleanup failed, video marked deleted instead of removed"
            );
        }
        Ok(())
    }

    async fn track_changed(
        &self,
        data: TrackData,
        fallback_status: Option<&str>,
    ) -> Result<(), WebhookError> {
        let asset_id = data.asset_id.as_deref().ok_or(WebhookError::MissingAssetId)?;
        let status = data.status.clone().or(fallback_status.map(str::to_string));
        let patch = VideoPatch {
            track_id: data.id.clone().map(Some),
            track_status: status.map(Some),
            ..Default::default()
        };

        match self.repo.update_by_asset_id(asset_id, &patch).await? {
            Some(record) => {
                info!(video_id = %record.id, asset_id, track_id = ?data.id, "track updated")
            }
            None => info!(asset_id, "track event for unknown asset"),
        }
        Ok(())
    }

    async fn update_upload(&self, upload_id: &str, patch: &VideoPatch) -> Result<(), WebhookError> {
        let Some(existing) = self.repo.find_by_upload_id(upload_id).await? else {
            info!(upload_id, "event for unknown upload");
            return Ok(());
        };
        log_transition(&existing, patch.status);

        if let Some(record) = self.repo.update_by_upload_id(upload_id, patch).await? {
            info!(video_id = %record.id, upload_id, status = %record.status, "video updated");
        }
        Ok(())
    }
}

/// Status writes are never refused; unexpected ones are only reported.
fn log_transition(record: &VideoRecord, next: Option<VideoStatus>) {
    if let Some(next) = next {
        if !record.status.allows_transition_to(next) {
            warn!(
                video_id = %record.id,
                from = %record.status,
                to = %next,
                "unexpected status transition"
            );
        }
    }
}
