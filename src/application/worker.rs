use super::generation::GenerationService;
use crate::domain::jobs::Job;
use crate::ports::queue::JobQueuePort;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Seconds a dequeue blocks before the loop polls again.
const DEQUEUE_TIMEOUT_SECS: f64 = 5.0;

/// What happened to a dequeued run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Retried,
    Dropped,
}

pub struct WorkerService {
    queue: Arc<dyn JobQueuePort>,
    generation: Arc<GenerationService>,
}

impl WorkerService {
    pub fn new(queue: Arc<dyn JobQueuePort>, generation: Arc<GenerationService>) -> Self {
        Self { queue, generation }
    }

    pub async fn run_worker_loop(&self, worker_id: usize) {
        info!(worker_id, "worker started");
        loop {
            match self.queue.dequeue_job(DEQUEUE_TIMEOUT_SECS).await {
                Ok(Some(job)) => {
                    self.process_job(job, worker_id).await;
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_id, error = %e, "queue error");
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Run one job. A failed run goes back on the queue while it has
    /// retries left.
    pub async fn process_job(&self, job: Job, worker_id: usize) -> RunOutcome {
        let kind = job.request.kind;
        info!(
            worker_id,
            run_id = %job.run_id,
            kind = kind.as_str(),
            attempt = job.attempt,
            "processing job"
        );

        let err = match self.generation.run(kind, &job.request.payload).await {
            Ok(video) => {
                info!(worker_id, run_id = %job.run_id, video_id = %video.id, "job completed");
                return RunOutcome::Completed;
            }
            Err(e) => e,
        };

        if !job.has_retries_left() {
            error!(
                worker_id,
                run_id = %job.run_id,
                kind = kind.as_str(),
                error = %err,
                "job failed, retries exhausted"
            );
            return RunOutcome::Dropped;
        }

        warn!(worker_id, run_id = %job.run_id, error = %err, "job failed, retrying");
        let run_id = job.run_id.clone();
        match self.queue.requeue_job(job.next_attempt()).await {
            Ok(()) => RunOutcome::Retried,
            Err(e) => {
                error!(worker_id, %run_id, error = %e, "failed to requeue job");
                RunOutcome::Dropped
            }
        }
    }
}
