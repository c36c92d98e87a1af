//! Redis error types for the local adapter.

use deadpool_redis::CreatePoolError;

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Create pool error: {0}")]
    CreatePool(String),
    /// An index key pointing at something that is not a video id.
    #[error("Corrupt index entry at {0}")]
    CorruptIndex(String),
    /// A watched record kept changing under every update attempt.
    #[error("Record at {0} kept changing during update")]
    Contended(String),
}

impl From<CreatePoolError> for QueueError {
    fn from(err: CreatePoolError) -> Self {
        QueueError::CreatePool(format!("{}", err))
    }
}
