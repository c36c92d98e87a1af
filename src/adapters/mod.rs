//! Adapters - Concrete implementations of ports.

#[cfg(feature = "aws")]
pub mod aws;

pub mod http;

#[cfg(feature = "local")]
pub mod local;

pub mod memory;
pub mod providers;
