use super::BoxError;
use crate::domain::jobs::{Job, WorkflowRequest};
use async_trait::async_trait;

/// Durable workflow runner seen from this service: runs are enqueued here and
/// drained by workers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a new run and return its run id
    async fn enqueue_job(&self, request: WorkflowRequest) -> Result<String, BoxError>;

    /// Put a failed run back for another attempt, keeping its run id
    async fn requeue_job(&self, job: Job) -> Result<(), BoxError>;

    /// Dequeue a run (blocking with timeout or non-blocking)
    /// timeout_secs: 0.0 for infinite (or long poll), >0.0 for specific timeout
    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, BoxError>;
}
