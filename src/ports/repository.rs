use super::BoxError;
use crate::domain::video::{VideoCursor, VideoPatch, VideoRecord};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for [`VideoRecord`]s.
///
/// Updates apply the whole patch to one record or nothing at all, and return
/// the record as stored afterwards (`None` when nothing matched).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn insert(&self, record: &VideoRecord) -> Result<(), BoxError>;

    /// Record `id`, only if it belongs to `owner_id`
    async fn find_owned(&self, id: Uuid, owner_id: Uuid)
        -> Result<Option<VideoRecord>, BoxError>;

    /// Up to `limit` of the owner's records after `after`, newest update first
    async fn list_owned(
        &self,
        owner_id: Uuid,
        after: Option<VideoCursor>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>, BoxError>;

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError>;

    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError>;

    async fn update_by_asset_id(
        &self,
        asset_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError>;

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError>;

    async fn delete_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError>;

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid)
        -> Result<Option<VideoRecord>, BoxError>;
}
