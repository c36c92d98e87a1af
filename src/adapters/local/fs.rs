use crate::domain::video::StoredObject;
use crate::ports::storage::StoragePort;
use crate::ports::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Stores objects as files under `root`. The monolith serves that directory
/// at `public_url`.
#[derive(Clone)]
pub struct FsStorage {
    root: PathBuf,
    public_url: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` inside the root, refusing anything that would escape it.
    fn path_for(&self, key: &str) -> Result<PathBuf, BoxError> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(format!("invalid object key: {}", key).into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StoragePort for FsStorage {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<StoredObject, BoxError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.public_url, key),
        })
    }

    async fn delete(&self, keys: &[String]) -> Result<(), BoxError> {
        for key in keys {
            let path = self.path_for(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
