use super::BoxError;
use crate::domain::video::StoredObject;
use async_trait::async_trait;
use bytes::Bytes;

/// Platform-owned object storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Store `body` under `key` and return its durable URL
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, BoxError>;

    /// Delete objects. Keys that no longer exist are not an error
    async fn delete(&self, keys: &[String]) -> Result<(), BoxError>;
}
