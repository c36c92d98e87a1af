//! Redis adapter for local deployment.
//!
//! This module provides Redis-backed implementations of:
//! - `JobQueuePort` for workflow runs
//! - `VideoRepository` for video records, with secondary indexes on the
//!   provider upload and asset ids and a per-owner id set

mod error;
mod pool;
mod queue;
mod repository;

pub use error::QueueError;
pub use pool::RedisPool;

/// Redis key constants
const WORKFLOW_QUEUE: &str = "vidhub:workflow_runs";
const VIDEO_PREFIX: &str = "vidhub:video:";
const UPLOAD_INDEX_PREFIX: &str = "vidhub:video_upload:";
const ASSET_INDEX_PREFIX: &str = "vidhub:video_asset:";
const OWNER_INDEX_PREFIX: &str = "vidhub:video_owner:";
