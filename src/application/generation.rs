//! Bodies of the out-of-process generation jobs.

use super::relocation::{AssetKind, AssetRelocator};
use crate::domain::jobs::{GenerationKind, JobPayload};
use crate::domain::media;
use crate::domain::video::{VideoPatch, VideoRecord};
use crate::ports::fetch::FetchPort;
use crate::ports::generation::{ImageGenerationPort, TextGenerationPort};
use crate::ports::repository::VideoRepository;
use crate::ports::BoxError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const TITLE_INSTRUCTIONS: &str = "Write a search-friendly title for a video, using only its transcript below. \
Keep it between 3 and 8 words and under 100 characters. \
Lead with the most distinctive thing the video covers and prefer plain words over jargon. \
Reply with the title alone as plain text, without quotes or formatting. Transcript:";

const DESCRIPTION_INSTRUCTIONS: &str = "Write a short description for a video, using only its transcript below. \
Summarize what a viewer will learn or see in at most 3 sentences and under 200 words. \
Do not invent details the transcript does not support. \
Reply with the description alone as plain text, without headings, lists or quotes. Transcript:";

/// Failures of a job run. All of them are reported back to the runner,
/// which decides whether to retry.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("video not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("transcript not available")]
    TranscriptUnavailable,
    #[error("transcript is empty")]
    EmptyTranscript,
    #[error("generation returned nothing")]
    EmptyResult,
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<BoxError> for JobError {
    fn from(err: BoxError) -> Self {
        JobError::Upstream(err.to_string())
    }
}

pub struct GenerationService {
    repo: Arc<dyn VideoRepository>,
    fetcher: Arc<dyn FetchPort>,
    text: Arc<dyn TextGenerationPort>,
    image: Arc<dyn ImageGenerationPort>,
    relocator: AssetRelocator,
}

impl GenerationService {
    pub fn new(
        repo: Arc<dyn VideoRepository>,
        fetcher: Arc<dyn FetchPort>,
        text: Arc<dyn TextGenerationPort>,
        image: Arc<dyn ImageGenerationPort>,
        relocator: AssetRelocator,
    ) -> Self {
        Self {
            repo,
            fetcher,
            text,
            image,
            relocator,
        }
    }

    pub async fn run(
        &self,
        kind: GenerationKind,
        payload: &JobPayload,
    ) -> Result<VideoRecord, JobError> {
        match kind {
            GenerationKind::Title => self.generate_title(payload).await,
            GenerationKind::Description => self.generate_description(payload).await,
            GenerationKind::Thumbnail => self.generate_thumbnail(payload).await,
        }
    }

    pub async fn generate_title(&self, payload: &JobPayload) -> Result<VideoRecord, JobError> {
        let title = self.from_transcript(payload, TITLE_INSTRUCTIONS).await?;
        let patch = VideoPatch {
            title: Some(title),
            ..Default::default()
        };
        self.write(payload, &patch).await
    }

    pub async fn generate_description(
        &self,
        payload: &JobPayload,
    ) -> Result<VideoRecord, JobError> {
        let description = self
            .from_transcript(payload, DESCRIPTION_INSTRUCTIONS)
            .await?;
        let patch = VideoPatch {
            description: Some(Some(description)),
            ..Default::default()
        };
        self.write(payload, &patch).await
    }

    pub async fn generate_thumbnail(&self, payload: &JobPayload) -> Result<VideoRecord, JobError> {
        let prompt = payload
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| JobError::InvalidInput("prompt is required".to_string()))?;
        let video = self.owned(payload).await?;

        let image = self.image.generate_image(prompt).await?;
        if image.bytes.is_empty() {
            return Err(JobError::EmptyResult);
        }
        let thumbnail = self
            .relocator
            .store(AssetKind::Thumbnail, image.bytes, &image.content_type)
            .await?;

        let patch = VideoPatch {
            thumbnail: Some(Some(thumbnail.clone())),
            ..Default::default()
        };
        let updated = match self.write(payload, &patch).await {
            Ok(updated) => updated,
            Err(e) => {
                self.relocator.discard(&[thumbnail.key]).await;
                return Err(e);
            }
        };

        if let Some(previous) = video.thumbnail {
            self.relocator.discard(&[previous.key]).await;
        }
        Ok(updated)
    }

    async fn from_transcript(
        &self,
        payload: &JobPayload,
        instructions: &str,
    ) -> Result<String, JobError> {
        let video = self.owned(payload).await?;
        let (playback_id, track_id) = match (&video.playback_id, &video.track_id) {
            (Some(playback_id), Some(track_id)) => (playback_id, track_id),
            _ => return Err(JobError::TranscriptUnavailable),
        };

        let body = self
            .fetcher
            .fetch(&media::transcript_url(playback_id, track_id))
            .await?;
        let transcript = String::from_utf8_lossy(&body);
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(JobError::EmptyTranscript);
        }

        let prompt = format!("{}\"{}\"", instructions, transcript);
        let generated = self.text.generate_text(&prompt).await?;
        let generated = generated.trim();
        if generated.is_empty() {
            return Err(JobError::EmptyResult);
        }
        Ok(generated.to_string())
    }

    async fn owned(&self, payload: &JobPayload) -> Result<VideoRecord, JobError> {
        self.repo
            .find_owned(payload.video_id, payload.owner_id)
            .await?
            .ok_or(JobError::NotFound)
    }

    async fn write(&self, payload: &JobPayload, patch: &VideoPatch) -> Result<VideoRecord, JobError> {
        let video = self
            .repo
            .update_owned(payload.video_id, payload.owner_id, patch)
            .await?
            .ok_or(JobError::NotFound)?;
        info!(video_id = %video.id, "generated metadata written");
        Ok(video)
    }
}
