use super::BoxError;
use crate::domain::media::{DirectUpload, ProviderAsset};
use async_trait::async_trait;
use uuid::Uuid;

/// Media transcoding provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProviderPort: Send + Sync {
    /// Open a direct upload for `owner_id`
    async fn create_upload(&self, owner_id: Uuid) -> Result<DirectUpload, BoxError>;

    async fn retrieve_upload(&self, upload_id: &str) -> Result<Option<DirectUpload>, BoxError>;

    async fn retrieve_asset(&self, asset_id: &str) -> Result<Option<ProviderAsset>, BoxError>;
}
