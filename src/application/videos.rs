//! Owner-scoped video reads, mutations and the generation triggers.

use super::relocation::{AssetKind, AssetRelocator};
use crate::domain::jobs::{GenerationKind, JobPayload, WorkflowRequest, MIN_PROMPT_CHARS};
use crate::domain::media;
use crate::domain::video::{VideoCursor, VideoPatch, VideoRecord, Visibility};
use crate::ports::media::MediaProviderPort;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::BoxError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Largest studio listing page.
pub const MAX_PAGE_SIZE: usize = 10;

/// Largest custom thumbnail accepted, in bytes.
pub const MAX_THUMBNAIL_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<BoxError> for VideoError {
    fn from(err: BoxError) -> Self {
        VideoError::Upstream(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUpload {
    pub video: VideoRecord,
    /// Where the client sends the file.
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub items: Vec<VideoRecord>,
    /// Pass back to continue; absent on the last page.
    pub next_cursor: Option<VideoCursor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub title: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub visibility: Option<Visibility>,
}

pub struct VideoService {
    repo: Arc<dyn VideoRepository>,
    media: Arc<dyn MediaProviderPort>,
    queue: Arc<dyn JobQueuePort>,
    relocator: AssetRelocator,
    retries: u32,
}

impl VideoService {
    pub fn new(
        repo: Arc<dyn VideoRepository>,
        media: Arc<dyn MediaProviderPort>,
        queue: Arc<dyn JobQueuePort>,
        relocator: AssetRelocator,
        retries: u32,
    ) -> Self {
        Self {
            repo,
            media,
            queue,
            relocator,
            retries,
        }
    }

    /// Open a provider upload and record it before any provider event can
    /// refer to it.
    pub async fn create_upload(&self, owner_id: Uuid) -> Result<CreatedUpload, VideoError> {
        let upload = self.media.create_upload(owner_id).await?;
        let url = upload
            .url
            .clone()
            .ok_or_else(|| VideoError::Upstream("provider returned no upload URL".to_string()))?;

        let video = VideoRecord::new_upload(owner_id, upload.id);
        self.repo.insert(&video).await?;
        info!(video_id = %video.id, %owner_id, upload_id = ?video.upload_id, "upload created");
        Ok(CreatedUpload { video, url })
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<VideoRecord, VideoError> {
        self.owned(owner_id, id).await
    }

    /// One page of the owner's videos, most recently updated first.
    pub async fn list(
        &self,
        owner_id: Uuid,
        after: Option<VideoCursor>,
        limit: usize,
    ) -> Result<VideoPage, VideoError> {
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(VideoError::BadRequest(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        // One extra row tells whether another page follows.
        let mut items = self.repo.list_owned(owner_id, after, limit + 1).await?;
        let has_more = items.len() > limit;
        items.truncate(limit);
        let next_cursor = if has_more {
            items.last().map(VideoCursor::of)
        } else {
            None
        };
        Ok(VideoPage { items, next_cursor })
    }

    pub async fn update_metadata(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: MetadataUpdate,
    ) -> Result<VideoRecord, VideoError> {
        let title = match update.title {
            Some(title) if title.trim().is_empty() => {
                return Err(VideoError::BadRequest("Title must not be empty".to_string()))
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };
        let patch = VideoPatch {
            title,
            description: update
                .description
                .map(|d| Some(d.trim().to_string()).filter(|d| !d.is_empty())),
            category_id: update.category_id.map(Some),
            visibility: update.visibility,
            ..Default::default()
        };

        self.repo
            .update_owned(id, owner_id, &patch)
            .await?
            .ok_or(VideoError::NotFound)
    }

    pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<VideoRecord, VideoError> {
        let removed = self
            .repo
            .delete_owned(id, owner_id)
            .await?
            .ok_or(VideoError::NotFound)?;
        self.relocator.discard(&removed.owned_keys()).await;
        info!(video_id = %id, %owner_id, "video removed");
        Ok(removed)
    }

    /// Replace the thumbnail with a fresh copy of the provider's still.
    pub async fn restore_thumbnail(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<VideoRecord, VideoError> {
        let existing = self.owned(owner_id, id).await?;

        if let Some(thumbnail) = &existing.thumbnail {
            self.relocator.discard(&[thumbnail.key.clone()]).await;
            let patch = VideoPatch {
                thumbnail: Some(None),
                ..Default::default()
            };
            self.repo.update_owned(id, owner_id, &patch).await?;
        }

        let playback_id = existing
            .playback_id
            .as_deref()
            .ok_or_else(|| VideoError::BadRequest("Video has no playback ID".to_string()))?;
        let thumbnail = self
            .relocator
            .relocate(&media::thumbnail_url(playback_id), AssetKind::Thumbnail)
            .await?;

        let patch = VideoPatch {
            thumbnail: Some(Some(thumbnail)),
            ..Default::default()
        };
        self.repo
            .update_owned(id, owner_id, &patch)
            .await?
            .ok_or(VideoError::NotFound)
    }

    /// Replace the thumbnail with an image the owner uploaded. The previous
    /// thumbnail object is dropped only once the record points at the new one.
    pub async fn upload_thumbnail(
        &self,
        owner_id: Uuid,
        id: Uuid,
        body: Bytes,
        content_type: &str,
    ) -> Result<VideoRecord, VideoError> {
        let content_type = content_type.split(';').next().unwrap_or_default().trim();
        if !content_type.starts_with("image/") {
            return Err(VideoError::BadRequest("Thumbnail must be an image".to_string()));
        }
        if body.is_empty() || body.len() > MAX_THUMBNAIL_BYTES {
            return Err(VideoError::BadRequest(format!(
                "Thumbnail must be between 1 byte and {} bytes",
                MAX_THUMBNAIL_BYTES
            )));
        }
        let existing = self.owned(owner_id, id).await?;

        let thumbnail = self
            .relocator
            .store(AssetKind::Thumbnail, body, content_type)
            .await?;
        let patch = VideoPatch {
            thumbnail: Some(Some(thumbnail.clone())),
            ..Default::default()
        };
        match self.repo.update_owned(id, owner_id, &patch).await {
            Ok(Some(updated)) => {
                if let Some(previous) = existing.thumbnail {
                    self.relocator.discard(&[previous.key]).await;
                }
                info!(video_id = %id, key = %thumbnail.key, "custom thumbnail stored");
                Ok(updated)
            }
            Ok(None) => {
                self.relocator.discard(&[thumbnail.key]).await;
                Err(VideoError::NotFound)
            }
            Err(e) => {
                self.relocator.discard(&[thumbnail.key]).await;
                Err(e.into())
            }
        }
    }

    /// Pull the current asset state from the provider, for records whose
    /// webhooks were missed.
    pub async fn revalidate(&self, owner_id: Uuid, id: Uuid) -> Result<VideoRecord, VideoError> {
        let existing = self.owned(owner_id, id).await?;
        let upload_id = existing
            .upload_id
            .as_deref()
            .ok_or_else(|| VideoError::BadRequest("Video has no upload ID".to_string()))?;

        let asset_id = self
            .media
            .retrieve_upload(upload_id)
            .await?
            .and_then(|upload| upload.asset_id)
            .ok_or_else(|| VideoError::BadRequest("Upload has no asset yet".to_string()))?;
        let asset = self
            .media
            .retrieve_asset(&asset_id)
            .await?
            .ok_or_else(|| VideoError::BadRequest("Asset not found at provider".to_string()))?;

        let (track_id, track_status) = match asset.transcript_track() {
            Ok((track_id, status)) => (Some(track_id), Some(status)),
            Err(found) => {
                warn!(
                    asset_id = %asset.id,
                    found,
                    "no unique english transcript track, keeping stored track"
                );
                (existing.track_id.clone(), existing.track_status.clone())
            }
        };

        let patch = VideoPatch {
            status: asset.status,
            playback_id: Some(asset.playback_ids.first().cloned()),
            asset_id: Some(Some(asset.id.clone())),
            track_id: Some(track_id),
            track_status: Some(track_status),
            duration_ms: Some(asset.duration_ms()),
            ..Default::default()
        };
        self.repo
            .update_owned(id, owner_id, &patch)
            .await?
            .ok_or(VideoError::NotFound)
    }

    pub async fn generate_title(&self, owner_id: Uuid, id: Uuid) -> Result<String, VideoError> {
        self.trigger(GenerationKind::Title, owner_id, id, None).await
    }

    pub async fn generate_description(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<String, VideoError> {
        self.trigger(GenerationKind::Description, owner_id, id, None)
            .await
    }

    pub async fn generate_thumbnail(
        &self,
        owner_id: Uuid,
        id: Uuid,
        prompt: String,
    ) -> Result<String, VideoError> {
        if prompt.chars().count() < MIN_PROMPT_CHARS {
            return Err(VideoError::BadRequest(format!(
                "Prompt must be at least {} characters",
                MIN_PROMPT_CHARS
            )));
        }
        self.trigger(GenerationKind::Thumbnail, owner_id, id, Some(prompt))
            .await
    }

    /// Hand a job to the workflow runner and return its run id without
    /// waiting for the job.
    async fn trigger(
        &self,
        kind: GenerationKind,
        owner_id: Uuid,
        video_id: Uuid,
        prompt: Option<String>,
    ) -> Result<String, VideoError> {
        self.owned(owner_id, video_id).await?;

        let request = WorkflowRequest {
            kind,
            payload: JobPayload {
                owner_id,
                video_id,
                prompt,
            },
            retries: self.retries,
        };
        let run_id = self.queue.enqueue_job(request).await?;
        info!(%video_id, kind = kind.as_str(), run_id = %run_id, "generation triggered");
        Ok(run_id)
    }

    async fn owned(&self, owner_id: Uuid, id: Uuid) -> Result<VideoRecord, VideoError> {
        self.repo
            .find_owned(id, owner_id)
            .await?
            .ok_or(VideoError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryQueue, MemoryRepository, MemoryStorage};
    use crate::domain::media::{AssetTrack, DirectUpload, ProviderAsset};
    use crate::domain::video::{StoredObject, VideoStatus};
    use crate::ports::fetch::MockFetchPort;
    use crate::ports::media::MockMediaProviderPort;
    use crate::ports::storage::StoragePort;

    struct Fixture {
        repo: MemoryRepository,
        storage: MemoryStorage,
        queue: MemoryQueue,
        service: VideoService,
    }

    fn fixture(media: MockMediaProviderPort) -> Fixture {
        let repo = MemoryRepository::new();
        let storage = MemoryStorage::new("https://cdn.test");
        let queue = MemoryQueue::new();
        let mut fetcher = MockFetchPort::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(Bytes::from_static(b"jpg")));
        let relocator = AssetRelocator::new(Arc::new(storage.clone()), Arc::new(fetcher));
        let service = VideoService::new(
            Arc::new(repo.clone()),
            Arc::new(media),
            Arc::new(queue.clone()),
            relocator,
            1,
        );
        Fixture {
            repo,
            storage,
            queue,
            service,
        }
    }

    async fn seed(repo: &MemoryRepository, owner_id: Uuid) -> VideoRecord {
        let record = VideoRecord::new_upload(owner_id, "up_1");
        repo.insert(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_create_upload_inserts_waiting_record() {
        let mut media = MockMediaProviderPort::new();
        media.expect_create_upload().times(1).returning(|_| {
            Ok(DirectUpload {
                id: "up_new".to_string(),
                url: Some("https://storage.mux.test/upload".to_string()),
                asset_id: None,
            })
        });
        let f = fixture(media);
        let owner = Uuid::new_v4();

        let created = f.service.create_upload(owner).await.unwrap();

        assert_eq!(created.url, "https://storage.mux.test/upload");
        let stored = f.repo.get(created.video.id).await.unwrap();
        assert_eq!(stored.owner_id, owner);
        assert_eq!(stored.status, VideoStatus::Waiting);
        assert_eq!(stored.upload_id.as_deref(), Some("up_new"));
    }

    #[tokio::test]
    async fn test_update_metadata_is_owner_scoped() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;
        let update = MetadataUpdate {
            title: Some("  Tour of the lab ".to_string()),
            description: Some(String::new()),
            visibility: Some(Visibility::Public),
            ..Default::default()
        };

        let result = f
            .service
            .update_metadata(Uuid::new_v4(), record.id, update.clone())
            .await;
        assert!(matches!(result, Err(VideoError::NotFound)));

        let updated = f
            .service
            .update_metadata(owner, record.id, update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Tour of the lab");
        assert_eq!(updated.description, None);
        assert_eq!(updated.visibility, Visibility::Public);
    }

    #[tokio::test]
    async fn test_update_metadata_rejects_blank_title() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;
        let update = MetadataUpdate {
            title: Some("   ".to_string()),
            ..Default::default()
        };

        let result = f.service.update_metadata(owner, record.id, update).await;
        assert!(matches!(result, Err(VideoError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_remove_deletes_record_and_objects() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let mut record = VideoRecord::new_upload(owner, "up_1");
        record.thumbnail = Some(
            f.storage
                .put("thumbnails/t.jpg", Bytes::from_static(b"t"), "image/jpeg")
                .await
                .unwrap(),
        );
        f.repo.insert(&record).await.unwrap();

        assert!(matches!(
            f.service.remove(Uuid::new_v4(), record.id).await,
            Err(VideoError::NotFound)
        ));
        let removed = f.service.remove(owner, record.id).await.unwrap();

        assert_eq!(removed.id, record.id);
        assert_eq!(f.repo.len().await, 0);
        assert!(f.storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_thumbnail_replaces_object() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let mut record = VideoRecord::new_upload(owner, "up_1");
        record.playback_id = Some("pb_1".to_string());
        record.thumbnail = Some(
            f.storage
                .put("thumbnails/custom.png", Bytes::from_static(b"c"), "image/png")
                .await
                .unwrap(),
        );
        f.repo.insert(&record).await.unwrap();

        let updated = f.service.restore_thumbnail(owner, record.id).await.unwrap();

        let thumbnail = updated.thumbnail.unwrap();
        assert_ne!(thumbnail.key, "thumbnails/custom.png");
        assert!(thumbnail.key.ends_with(".jpg"));
        assert_eq!(f.storage.keys().await, vec![thumbnail.key]);
    }

    #[tokio::test]
    async fn test_restore_thumbnail_requires_playback_id() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let mut record = VideoRecord::new_upload(owner, "up_1");
        record.thumbnail = Some(StoredObject {
            key: "thumbnails/old.jpg".to_string(),
            url: "https://cdn.test/thumbnails/old.jpg".to_string(),
        });
        f.repo.insert(&record).await.unwrap();

        let result = f.service.restore_thumbnail(owner, record.id).await;

        assert!(matches!(result, Err(VideoError::BadRequest(_))));
        assert_eq!(f.repo.get(record.id).await.unwrap().thumbnail, None);
    }

    #[tokio::test]
    async fn test_revalidate_copies_provider_state() {
        let mut media = MockMediaProviderPort::new();
        media
            .expect_retrieve_upload()
            .withf(|id| id == "up_1")
            .returning(|id| {
                Ok(Some(DirectUpload {
                    id: id.to_string(),
                    url: None,
                    asset_id: Some("as_1".to_string()),
                }))
            });
        media.expect_retrieve_asset().returning(|id| {
            Ok(Some(ProviderAsset {
                id: id.to_string(),
                status: Some(VideoStatus::Ready),
                duration: Some(61.25),
                playback_ids: vec!["pb_9".to_string()],
                tracks: vec![AssetTrack {
                    id: Some("tr_9".to_string()),
                    kind: Some("text".to_string()),
                    language_code: Some("en".to_string()),
                    status: Some("ready".to_string()),
                }],
            }))
        });
        let f = fixture(media);
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        let updated = f.service.revalidate(owner, record.id).await.unwrap();

        assert_eq!(updated.status, VideoStatus::Ready);
        assert_eq!(updated.asset_id.as_deref(), Some("as_1"));
        assert_eq!(updated.playback_id.as_deref(), Some("pb_9"));
        assert_eq!(updated.track_id.as_deref(), Some("tr_9"));
        assert_eq!(updated.duration_ms, 61250);
    }

    #[tokio::test]
    async fn test_revalidate_without_asset_is_bad_request() {
        let mut media = MockMediaProviderPort::new();
        media.expect_retrieve_upload().returning(|id| {
            Ok(Some(DirectUpload {
                id: id.to_string(),
                url: Some("https://storage.mux.test/upload".to_string()),
                asset_id: None,
            }))
        });
        let f = fixture(media);
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        let result = f.service.revalidate(owner, record.id).await;
        assert!(matches!(result, Err(VideoError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_generate_enqueues_and_returns_run_id() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        let run_id = f.service.generate_title(owner, record.id).await.unwrap();

        let pending = f.queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].run_id, run_id);
        assert_eq!(pending[0].request.kind, GenerationKind::Title);
        assert_eq!(pending[0].request.retries, 1);
        assert_eq!(pending[0].request.payload.owner_id, owner);
        assert_eq!(pending[0].request.payload.video_id, record.id);
    }

    #[tokio::test]
    async fn test_generate_thumbnail_by_non_owner_is_not_found() {
        let f = fixture(MockMediaProviderPort::new());
        let record = seed(&f.repo, Uuid::new_v4()).await;

        let result = f
            .service
            .generate_thumbnail(Uuid::new_v4(), record.id, "a sunny beach at dawn".to_string())
            .await;

        assert!(matches!(result, Err(VideoError::NotFound)));
        assert!(f.queue.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_thumbnail_requires_prompt_length() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        let result = f
            .service
            .generate_thumbnail(owner, record.id, "too short".to_string())
            .await;
        assert!(matches!(result, Err(VideoError::BadRequest(_))));

        let run_id = f
            .service
            .generate_thumbnail(owner, record.id, "ten chars!".to_string())
            .await
            .unwrap();
        let pending = f.queue.pending().await;
        assert_eq!(pending[0].run_id, run_id);
        assert_eq!(pending[0].request.payload.prompt.as_deref(), Some("ten chars!"));
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        assert_eq!(f.service.get(owner, record.id).await.unwrap(), record);
        assert!(matches!(
            f.service.get(Uuid::new_v4(), record.id).await,
            Err(VideoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_pages_with_cursor() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        for _ in 0..3 {
            seed(&f.repo, owner).await;
        }
        seed(&f.repo, Uuid::new_v4()).await;

        let first = f.service.list(owner, None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.next_cursor.unwrap();
        assert_eq!(cursor, VideoCursor::of(&first.items[1]));

        let second = f.service.list(owner, Some(cursor), 2).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_cursor.is_none());
        assert!(!first.items.contains(&second.items[0]));
        assert!(second.items.iter().all(|r| r.owner_id == owner));
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_limit() {
        let f = fixture(MockMediaProviderPort::new());
        for limit in [0, MAX_PAGE_SIZE + 1] {
            let result = f.service.list(Uuid::new_v4(), None, limit).await;
            assert!(matches!(result, Err(VideoError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_upload_thumbnail_replaces_previous_object() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let mut record = VideoRecord::new_upload(owner, "up_1");
        record.thumbnail = Some(
            f.storage
                .put("thumbnails/old.jpg", Bytes::from_static(b"o"), "image/jpeg")
                .await
                .unwrap(),
        );
        f.repo.insert(&record).await.unwrap();

        let updated = f
            .service
            .upload_thumbnail(owner, record.id, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let thumbnail = updated.thumbnail.unwrap();
        assert!(thumbnail.key.starts_with("thumbnails/"));
        assert!(thumbnail.key.ends_with(".png"));
        assert_eq!(f.storage.keys().await, vec![thumbnail.key]);
    }

    #[tokio::test]
    async fn test_upload_thumbnail_checks_type_and_owner() {
        let f = fixture(MockMediaProviderPort::new());
        let owner = Uuid::new_v4();
        let record = seed(&f.repo, owner).await;

        let result = f
            .service
            .upload_thumbnail(owner, record.id, Bytes::from_static(b"%PDF"), "application/pdf")
            .await;
        assert!(matches!(result, Err(VideoError::BadRequest(_))));

        let result = f
            .service
            .upload_thumbnail(Uuid::new_v4(), record.id, Bytes::from_static(b"png"), "image/png")
            .await;
        assert!(matches!(result, Err(VideoError::NotFound)));
        assert!(f.storage.keys().await.is_empty());
    }
}
