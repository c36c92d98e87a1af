//! Ports - Trait definitions for every external collaborator.

pub mod fetch;
pub mod generation;
pub mod media;
pub mod queue;
pub mod repository;
pub mod storage;

/// Error type shared by all ports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
