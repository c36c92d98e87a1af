//! Redis JobQueuePort implementation.

use super::error::QueueError;
use super::pool::RedisPool;
use super::WORKFLOW_QUEUE;
use crate::domain::jobs::{new_run_id, Job, WorkflowRequest};
use crate::ports::queue::JobQueuePort;
use crate::ports::BoxError;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

impl RedisPool {
    async fn push(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(WORKFLOW_QUEUE, json).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueuePort for RedisPool {
    async fn enqueue_job(&self, request: WorkflowRequest) -> Result<String, BoxError> {
        let job = Job::new(new_run_id(), request);
        self.push(&job).await?;
        Ok(job.run_id)
    }

    async fn requeue_job(&self, job: Job) -> Result<(), BoxError> {
        self.push(&job).await?;
        Ok(())
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, BoxError> {
        let mut conn = self.pool.get().await.map_err(QueueError::from)?;
        let result: Option<(String, String)> = conn
            .brpop(WORKFLOW_QUEUE, timeout_secs)
            .await
            .map_err(QueueError::from)?;
        match result {
            Some((_, json)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
