//! Configuration models and loaders.

pub mod queue;

pub use queue::{ConfigError, QueueConfig};
