//! In-process adapters. The service and router tests run against these.

use crate::domain::jobs::{new_run_id, Job, WorkflowRequest};
use crate::domain::video::{page_after, StoredObject, VideoCursor, VideoPatch, VideoRecord};
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use crate::ports::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryRepository {
    records: Arc<RwLock<HashMap<Uuid, VideoRecord>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<VideoRecord> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn update_where<F>(&self, matches: F, patch: &VideoPatch) -> Option<VideoRecord>
    where
        F: Fn(&VideoRecord) -> bool + Send,
    {
        let mut records = self.records.write().await;
        let record = records.values_mut().find(|record| matches(record))?;
        patch.apply(record);
        Some(record.clone())
    }

    async fn delete_where<F>(&self, matches: F) -> Option<VideoRecord>
    where
        F: Fn(&VideoRecord) -> bool + Send,
    {
        let mut records = self.records.write().await;
        let id = records.values().find(|record| matches(record))?.id;
        records.remove(&id)
    }
}

#[async_trait]
impl VideoRepository for MemoryRepository {
    async fn insert(&self, record: &VideoRecord) -> Result<(), BoxError> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    async fn list_owned(
        &self,
        owner_id: Uuid,
        after: Option<VideoCursor>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>, BoxError> {
        let owned = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(page_after(owned, after, limit))
    }

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| record.upload_id.as_deref() == Some(upload_id))
            .cloned())
    }

    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .update_where(|r| r.upload_id.as_deref() == Some(upload_id), patch)
            .await)
    }

    async fn update_by_asset_id(
        &self,
        asset_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .update_where(|r| r.asset_id.as_deref() == Some(asset_id), patch)
            .await)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .update_where(|r| r.id == id && r.owner_id == owner_id, patch)
            .await)
    }

    async fn delete_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .delete_where(|r| r.upload_id.as_deref() == Some(upload_id))
            .await)
    }

    async fn delete_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self
            .delete_where(|r| r.id == id && r.owner_id == owner_id)
            .await)
    }
}

/// Object storage kept in a map; URLs are `<public_url>/<key>`.
#[derive(Clone)]
pub struct MemoryStorage {
    public_url: String,
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
}

impl MemoryStorage {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            objects: Arc::default(),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, BoxError> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.public_url.trim_end_matches('/'), key),
        })
    }

    async fn delete(&self, keys: &[String]) -> Result<(), BoxError> {
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

/// FIFO run queue.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
    notify: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending(&self) -> Vec<Job> {
        self.jobs.lock().await.iter().cloned().collect()
    }

    async fn push(&self, job: Job) {
        self.jobs.lock().await.push_back(job);
        self.notify.notify_one();
    }
}

#[async_trait]
impl JobQueuePort for MemoryQueue {
    async fn enqueue_job(&self, request: WorkflowRequest) -> Result<String, BoxError> {
        let run_id = new_run_id();
        self.push(Job::new(run_id.clone(), request)).await;
        Ok(run_id)
    }

    async fn requeue_job(&self, job: Job) -> Result<(), BoxError> {
        self.push(job).await;
        Ok(())
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, BoxError> {
        if let Some(job) = self.jobs.lock().await.pop_front() {
            return Ok(Some(job));
        }
        if timeout_secs > 0.0 {
            let _ = tokio::time::timeout(
                Duration::from_secs_f64(timeout_secs),
                self.notify.notified(),
            )
            .await;
        } else {
            self.notify.notified().await;
        }
        Ok(self.jobs.lock().await.pop_front())
    }
}
