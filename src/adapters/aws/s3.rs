use crate::domain::video::StoredObject;
use crate::ports::storage::StoragePort;
use crate::ports::BoxError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;

/// S3Storage implements StoragePort for AWS S3. Objects are served from
/// `public_url` (the bucket website or a CDN in front of it).
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StoragePort for S3Storage {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, BoxError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.public_url, key),
        })
    }

    async fn delete(&self, keys: &[String]) -> Result<(), BoxError> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()?;

        let resp = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await?;

        let failed: Vec<&str> = resp
            .errors()
            .iter()
            .filter_map(|e| e.key())
            .collect();
        if !failed.is_empty() {
            return Err(format!("failed to delete objects: {}", failed.join(", ")).into());
        }
        Ok(())
    }
}
