//! Redis VideoRepository implementation.
//!
//! Each record is one JSON value under `vidhub:video:<id>`. The upload and
//! asset ids are indexed by keys holding the video id, and each owner has a
//! set of their video ids for the studio listing. A write replaces the
//! record and its index entries in one MULTI block. Updates and deletes WATCH
//! the record key first, so a record deleted between the read and the write
//! stays deleted; concurrent patches to a live record are retried against the
//! fresh value.

use super::error::QueueError;
use super::pool::RedisPool;
use super::{ASSET_INDEX_PREFIX, OWNER_INDEX_PREFIX, UPLOAD_INDEX_PREFIX, VIDEO_PREFIX};
use crate::domain::video::{page_after, VideoCursor, VideoPatch, VideoRecord};
use crate::ports::repository::VideoRepository;
use crate::ports::BoxError;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::Connection;
use uuid::Uuid;

/// Attempts at an optimistic update before giving up on a hot record.
const MAX_WATCH_ATTEMPTS: usize = 5;

fn video_key(id: Uuid) -> String {
    format!("{}{}", VIDEO_PREFIX, id)
}

fn upload_key(upload_id: &str) -> String {
    format!("{}{}", UPLOAD_INDEX_PREFIX, upload_id)
}

fn asset_key(asset_id: &str) -> String {
    format!("{}{}", ASSET_INDEX_PREFIX, asset_id)
}

fn owner_key(owner_id: Uuid) -> String {
    format!("{}{}", OWNER_INDEX_PREFIX, owner_id)
}

fn index_keys(record: &VideoRecord) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(upload_id) = &record.upload_id {
        keys.push(upload_key(upload_id));
    }
    if let Some(asset_id) = &record.asset_id {
        keys.push(asset_key(asset_id));
    }
    keys
}

/// Index entries a write must drop, given the record's previous state.
fn stale_index_keys(previous: Option<&VideoRecord>, next: &VideoRecord) -> Vec<String> {
    let current = index_keys(next);
    previous
        .map(index_keys)
        .unwrap_or_default()
        .into_iter()
        .filter(|key| !current.contains(key))
        .collect()
}

async fn load(conn: &mut Connection, id: Uuid) -> Result<Option<VideoRecord>, QueueError> {
    let json: Option<String> = conn.get(video_key(id)).await?;
    match json {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

async fn resolve(conn: &mut Connection, index_key: &str) -> Result<Option<Uuid>, QueueError> {
    let value: Option<String> = conn.get(index_key).await?;
    value
        .map(|id| Uuid::parse_str(&id).map_err(|_| QueueError::CorruptIndex(index_key.to_string())))
        .transpose()
}

/// Writes `record` and its index entries in one transaction. Returns `false`
/// when a watched key changed since WATCH and nothing was written.
async fn store(
    conn: &mut Connection,
    previous: Option<&VideoRecord>,
    record: &VideoRecord,
) -> Result<bool, QueueError> {
    let json = serde_json::to_string(record)?;
    let id = record.id.to_string();

    let mut pipe = redis::pipe();
    pipe.atomic();
    pipe.set(video_key(record.id), json).ignore();
    for key in stale_index_keys(previous, record) {
        pipe.del(key).ignore();
    }
    for key in index_keys(record) {
        pipe.set(key, &id).ignore();
    }
    pipe.sadd(owner_key(record.owner_id), &id).ignore();
    let committed: Option<()> = pipe.query_async(conn).await?;
    Ok(committed.is_some())
}

/// Deletes the record and its index entries in one transaction, with the
/// same abort semantics as `store`.
async fn remove(conn: &mut Connection, record: &VideoRecord) -> Result<bool, QueueError> {
    let mut keys = index_keys(record);
    keys.push(video_key(record.id));

    let mut pipe = redis::pipe();
    pipe.atomic();
    pipe.del(keys).ignore();
    pipe.srem(owner_key(record.owner_id), record.id.to_string()).ignore();
    let committed: Option<()> = pipe.query_async(conn).await?;
    Ok(committed.is_some())
}

async fn watch(conn: &mut Connection, id: Uuid) -> Result<(), QueueError> {
    redis::cmd("WATCH")
        .arg(video_key(id))
        .query_async::<_, ()>(conn)
        .await?;
    Ok(())
}

async fn unwatch(conn: &mut Connection) -> Result<(), QueueError> {
    redis::cmd("UNWATCH").query_async::<_, ()>(conn).await?;
    Ok(())
}

fn visible_to(record: Option<VideoRecord>, owner_id: Option<Uuid>) -> Option<VideoRecord> {
    record.filter(|r| owner_id.map_or(true, |owner| r.owner_id == owner))
}

impl RedisPool {
    async fn resolve_indexed(&self, index_key: &str) -> Result<Option<Uuid>, QueueError> {
        let mut conn = self.pool.get().await?;
        resolve(&mut conn, index_key).await
    }

    async fn find_indexed(&self, index_key: &str) -> Result<Option<VideoRecord>, QueueError> {
        let mut conn = self.pool.get().await?;
        match resolve(&mut conn, index_key).await? {
            Some(id) => load(&mut conn, id).await,
            None => Ok(None),
        }
    }

    /// Applies `patch` to the live record under WATCH. A record that is gone
    /// (or not owned by `owner_id`) is left alone and reported as `None`.
    async fn patch_record(
        &self,
        id: Option<Uuid>,
        owner_id: Option<Uuid>,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, QueueError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let mut conn = self.pool.get().await?;
        for _ in 0..MAX_WATCH_ATTEMPTS {
            watch(&mut conn, id).await?;
            let Some(previous) = visible_to(load(&mut conn, id).await?, owner_id) else {
                unwatch(&mut conn).await?;
                return Ok(None);
            };
            let mut updated = previous.clone();
            patch.apply(&mut updated);

            if store(&mut conn, Some(&previous), &updated).await? {
                return Ok(Some(updated));
            }
            tracing::debug!(video_id = %id, "record changed during update, retrying");
        }
        Err(QueueError::Contended(video_key(id)))
    }

    async fn remove_record(
        &self,
        id: Option<Uuid>,
        owner_id: Option<Uuid>,
    ) -> Result<Option<VideoRecord>, QueueError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let mut conn = self.pool.get().await?;
        for _ in 0..MAX_WATCH_ATTEMPTS {
            watch(&mut conn, id).await?;
            let Some(record) = visible_to(load(&mut conn, id).await?, owner_id) else {
                unwatch(&mut conn).await?;
                return Ok(None);
            };
            if remove(&mut conn, &record).await? {
                return Ok(Some(record));
            }
            tracing::debug!(video_id = %id, "record changed during delete, retrying");
        }
        Err(QueueError::Contended(video_key(id)))
    }
}

#[async_trait]
impl VideoRepository for RedisPool {
    async fn insert(&self, record: &VideoRecord) -> Result<(), BoxError> {
        let mut conn = self.pool.get().await.map_err(QueueError::from)?;
        // Nothing is watched here, so the transaction always commits.
        store(&mut conn, None, record).await?;
        Ok(())
    }

    async fn find_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let mut conn = self.pool.get().await.map_err(QueueError::from)?;
        let record = load(&mut conn, id).await?;
        Ok(record.filter(|r| r.owner_id == owner_id))
    }

    async fn list_owned(
        &self,
        owner_id: Uuid,
        after: Option<VideoCursor>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>, BoxError> {
        let mut conn = self.pool.get().await.map_err(QueueError::from)?;
        let ids: Vec<String> = conn
            .smembers(owner_key(owner_id))
            .await
            .map_err(QueueError::from)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids
            .iter()
            .map(|id| format!("{}{}", VIDEO_PREFIX, id))
            .collect();
        let values: Vec<Option<String>> = conn.mget(keys).await.map_err(QueueError::from)?;
        // Members whose record is already gone are skipped.
        let records = values
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str::<VideoRecord>(&json))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page_after(records, after, limit))
    }

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self.find_indexed(&upload_key(upload_id)).await?)
    }

    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let id = self.resolve_indexed(&upload_key(upload_id)).await?;
        Ok(self.patch_record(id, None, patch).await?)
    }

    async fn update_by_asset_id(
        &self,
        asset_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let id = self.resolve_indexed(&asset_key(asset_id)).await?;
        Ok(self.patch_record(id, None, patch).await?)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self.patch_record(Some(id), Some(owner_id), patch).await?)
    }

    async fn delete_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        let id = self.resolve_indexed(&upload_key(upload_id)).await?;
        Ok(self.remove_record(id, None).await?)
    }

    async fn delete_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self.remove_record(Some(id), Some(owner_id)).await?)
    }
}
