//! AWS API Binary
//!
//! Serves the HTTP API (webhook, studio mutations, job endpoints) on top of
//! the AWS adapters. Generation runs land on SQS and are drained by
//! `aws_worker`.
//!
//! Environment Variables:
//! - AWS_REGION: AWS region (e.g., us-east-1)
//! - S3_BUCKET, S3_PUBLIC_URL: storage for thumbnails and previews
//! - SQS_QUEUE_URL: SQS queue URL for workflow runs
//! - DYNAMODB_TABLE: DynamoDB table for video records
//! - plus everything `AppConfig` reads

use std::sync::Arc;
use vidhub::adapters::aws::{DynamoRepository, S3Storage, SqsQueue};
use vidhub::adapters::providers;
use vidhub::domain::signature::WebhookVerifier;
use vidhub::{router, telemetry, AppConfig, AppState, AwsConfig, Services};

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

    let verifier = WebhookVerifier::new(&config.mux_webhook_secret)
        .with_tolerance(config.webhook_tolerance_secs);
    let state =
        AppState::new(services, verifier).with_workflow_token(&config.workflow_token);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
