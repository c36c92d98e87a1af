//! Vidhub - Media reconciliation service for a video platform
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (records, provider events, signatures, jobs)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (HTTP inbound, provider clients,
//!   memory, local, aws)
//! - application/: Services over the ports
//! - config: Environment configuration
//!
//! # Features
//! - `local`: Monolith deployment (filesystem storage, Redis records and queue)
//! - `aws`: AWS deployment (S3, SQS, DynamoDB)
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use adapters::http::{router, AppState};
pub use application::{Ports, Services};
pub use config::AppConfig;

#[cfg(feature = "local")]
pub use config::LocalConfig;

#[cfg(feature = "aws")]
pub use config::AwsConfig;
