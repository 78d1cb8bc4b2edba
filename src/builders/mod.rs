//! Builders to construct queues from configuration.

pub mod queue_builder;

pub use queue_builder::{build_queue, build_shared_queue};
