//! Domain layer - Pure business logic.

pub mod events;
pub mod jobs;
pub mod media;
pub mod signature;
pub mod video;
