//! AWS adapters: S3 storage, SQS workflow queue, DynamoDB records.

pub mod dynamodb;
pub mod s3;
pub mod sqs;

pub use dynamodb::DynamoRepository;
pub use s3::S3Storage;
pub use sqs::SqsQueue;
