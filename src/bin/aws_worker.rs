//! AWS Worker Binary
//!
//! Long-running worker (ECS task or Batch job) that:
//! 1. Connects to AWS services (S3, SQS, DynamoDB) and the provider APIs.
//! 2. Runs `WORKERS` generation loops over the SQS workflow queue.
//!
//! Environment Variables:
//! - AWS_REGION: AWS region (e.g., us-east-1)
//! - S3_BUCKET, S3_PUBLIC_URL: storage for generated thumbnails
//! - SQS_QUEUE_URL: SQS queue URL for workflow runs
//! - DYNAMODB_TABLE: DynamoDB table for video records
//! - WORKERS: concurrent loops (default 4)

use futures::future::join_all;
use std::sync::Arc;
use vidhub::adapters::aws::{DynamoRepository, S3Storage, SqsQueue};
use vidhub::adapters::providers;
use vidhub::{telemetry, AppConfig, AwsConfig, Services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let config = AppConfig::from_env()?;
    let aws = AwsConfig::from_env()?;

    // Load AWS config
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    // Create adapters
    let storage = S3Storage::new(
        aws_sdk_s3::Client::new(&sdk_config),
        aws.s3_bucket,
        aws.s3_public_url,
    );
    let queue = SqsQueue::new(aws_sdk_sqs::Client::new(&sdk_config), aws.sqs_queue_url);
    let repo = DynamoRepository::new(
        aws_sdk_dynamodb::Client::new(&sdk_config),
        aws.dynamodb_table,
    );

    let ports = providers::wire(&config, Arc::new(repo), Arc::new(storage), Arc::new(queue));
    let services = Services::with_retries(ports, config.workflow_retries);

    tracing::info!(workers = aws.workers, "AWS worker started, polling for jobs");
    let loops = (0..aws.workers).map(|i| {
        let worker = services.worker();
        async move { worker.run_worker_loop(i).await }
    });
    join_all(loops).await;
    Ok(())
}
