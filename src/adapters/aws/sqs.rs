use crate::domain::jobs::{new_run_id, Job, WorkflowRequest};
use crate::ports::queue::JobQueuePort;
use crate::ports::BoxError;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use tracing::error;

/// SqsQueue implements JobQueuePort for AWS SQS.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

/// A received body as a job. An empty body carries nothing to run.
fn decode_body(body: Option<&str>) -> Result<Option<Job>, serde_json::Error> {
    match body {
        Some(body) if !body.trim().is_empty() => serde_json::from_str(body).map(Some),
        _ => Ok(None),
    }
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    async fn send(&self, job: &Job) -> Result<(), BoxError> {
        let message_body = serde_json::to_string(job)?;
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message_body)
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueuePort for SqsQueue {
    async fn enqueue_job(&self, request: WorkflowRequest) -> Result<String, BoxError> {
        let job = Job::new(new_run_id(), request);
        self.send(&job).await?;
        Ok(job.run_id)
    }

    async fn requeue_job(&self, job: Job) -> Result<(), BoxError> {
        self.send(&job).await
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, BoxError> {
        // SQS long polling tops out at 20 seconds.
        let wait_time = timeout_secs.ceil().clamp(0.0, 20.0) as i32;
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_time)
            .send()
            .await?;

        let Some(msg) = resp.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        // Deleted before decoding: failed runs come back through requeue_job,
        // and a body that does not decode now never will.
        if let Some(receipt_handle) = msg.receipt_handle() {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await?;
        }

        decode_body(msg.body()).map_err(|e| {
            error!(message_id = ?msg.message_id(), error = %e, "dropped undecodable job message");
            e.into()
        })
    }
}
