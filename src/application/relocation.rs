//! Moves provider-hosted temporary images into platform storage.

use crate::domain::video::StoredObject;
use crate::ports::fetch::FetchPort;
use crate::ports::storage::StoragePort;
use crate::ports::BoxError;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Thumbnail,
    Preview,
}

impl AssetKind {
    fn prefix(self) -> &'static str {
        match self {
            AssetKind::Thumbnail => "thumbnails",
            AssetKind::Preview => "previews",
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to relocate thumbnail or preview")]
pub struct RelocationError;

#[derive(Clone)]
pub struct AssetRelocator {
    storage: Arc<dyn StoragePort>,
    fetcher: Arc<dyn FetchPort>,
}

impl AssetRelocator {
    pub fn new(storage: Arc<dyn StoragePort>, fetcher: Arc<dyn FetchPort>) -> Self {
        Self { storage, fetcher }
    }

    /// Fetch `url` and store its bytes under a fresh key.
    pub async fn relocate(&self, url: &str, kind: AssetKind) -> Result<StoredObject, BoxError> {
        let body = self.fetcher.fetch(url).await?;
        let extension = url_extension(url).unwrap_or("bin");
        let key = object_key(kind, extension);
        let content_type = mime_guess::from_ext(extension)
            .first_or_octet_stream()
            .to_string();

        let object = self.storage.put(&key, body, &content_type).await?;
        debug!(url, key = %object.key, "relocated provider asset");
        Ok(object)
    }

    /// Relocate thumbnail and preview together. Either both land in storage
    /// or neither is kept.
    pub async fn relocate_pair(
        &self,
        thumbnail_url: &str,
        preview_url: &str,
    ) -> Result<(StoredObject, StoredObject), RelocationError> {
        let (thumbnail, preview) = tokio::join!(
            self.relocate(thumbnail_url, AssetKind::Thumbnail),
            self.relocate(preview_url, AssetKind::Preview),
        );

        match (thumbnail, preview) {
            (Ok(thumbnail), Ok(preview)) => Ok((thumbnail, preview)),
            (thumbnail, preview) => {
                let mut orphans = Vec::new();
                for (name, result) in [("thumbnail", thumbnail), ("preview", preview)] {
                    match result {
                        Ok(object) => orphans.push(object.key),
                        Err(e) => warn!(asset = name, error = %e, "relocation failed"),
                    }
                }
                self.discard(&orphans).await;
                Err(RelocationError)
            }
        }
    }

    /// Store generated bytes as a new object of `kind`.
    pub async fn store(
        &self,
        kind: AssetKind,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, BoxError> {
        let extension = mime_guess::get_mime_extensions_str(content_type)
            .and_then(|extensions| extensions.first())
            .copied()
            .unwrap_or("bin");
        let key = object_key(kind, extension);
        self.storage.put(&key, body, content_type).await
    }

    /// Best-effort removal of stored objects. Returns whether every key is
    /// gone; failures are logged, never propagated.
    pub async fn discard(&self, keys: &[String]) -> bool {
        if keys.is_empty() {
            return true;
        }
        match self.storage.delete(keys).await {
            Ok(()) => true,
            Err(e) => {
                warn!(?keys, error = %e, "failed to delete stored objects");
                false
            }
        }
    }
}

fn object_key(kind: AssetKind, extension: &str) -> String {
    format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), extension)
}

fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let file_name = path.rsplit('/').next()?;
    Path::new(file_name).extension()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStorage;
    use crate::ports::fetch::MockFetchPort;
    use crate::ports::storage::MockStoragePort;

    fn fetcher_serving_everything() -> MockFetchPort {
        let mut fetcher = MockFetchPort::new();
        fetcher
            .expect_fetch()
            .returning(|url| Ok(Bytes::from(url.to_string())));
        fetcher
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(
            url_extension("https://image.mux.com/pb/thumbnail.jpg"),
            Some("jpg")
        );
        assert_eq!(
            url_extension("https://image.mux.com/pb/animated.gif?width=320"),
            Some("gif")
        );
        assert_eq!(url_extension("https://image.mux.com/pb/raw"), None);
    }

    #[tokio::test]
    async fn test_relocate_stores_under_kind_prefix() {
        let storage = MemoryStorage::new("https://cdn.test");
        let relocator =
            AssetRelocator::new(Arc::new(storage.clone()), Arc::new(fetcher_serving_everything()));

        let object = relocator
            .relocate("https://image.mux.com/pb/thumbnail.jpg", AssetKind::Thumbnail)
            .await
            .unwrap();

        assert!(object.key.starts_with("thumbnails/"));
        assert!(object.key.ends_with(".jpg"));
        assert_eq!(object.url, format!("https://cdn.test/{}", object.key));
        assert!(storage.contains(&object.key).await);
    }

    #[tokio::test]
    async fn test_pair_failure_discards_the_orphan() {
        let storage = MemoryStorage::new("https://cdn.test");
        let mut fetcher = MockFetchPort::new();
        fetcher.expect_fetch().returning(|url| {
            if url.ends_with(".gif") {
                Err("provider unavailable".into())
            } else {
                Ok(Bytes::from_static(b"jpg"))
            }
        });
        let relocator = AssetRelocator::new(Arc::new(storage.clone()), Arc::new(fetcher));

        let result = relocator
            .relocate_pair(
                "https://image.mux.com/pb/thumbnail.jpg",
                "https://image.mux.com/pb/animated.gif",
            )
            .await;

        assert!(result.is_err());
        assert!(storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_discard_reports_failures() {
        let mut storage = MockStoragePort::new();
        storage
            .expect_delete()
            .times(1)
            .returning(|_| Err("bucket unavailable".into()));
        let relocator =
            AssetRelocator::new(Arc::new(storage), Arc::new(fetcher_serving_everything()));

        assert!(relocator.discard(&[]).await);
        assert!(!relocator.discard(&["thumbnails/a.jpg".to_string()]).await);
    }

    #[tokio::test]
    async fn test_store_uses_content_type_extension() {
        let storage = MemoryStorage::new("https://cdn.test");
        let relocator =
            AssetRelocator::new(Arc::new(storage.clone()), Arc::new(fetcher_serving_everything()));

        let object = relocator
            .store(AssetKind::Thumbnail, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        assert!(object.key.starts_with("thumbnails/"));
        assert!(object.key.ends_with(".png"));
    }
}
