//! Build queues from configuration.

use std::sync::Arc;

use crate::config::{ConfigError, QueueConfig};
use crate::core::AdQueue;

/// Validate `cfg` and build an empty queue.
pub fn build_queue(cfg: &QueueConfig) -> Result<AdQueue, ConfigError> {
    cfg.validate()?;
    let normalized = cfg.normalized();
    if normalized != *cfg {
        tracing::warn!(
            configured_tiers = cfg.total_tiers,
            configured_weight = cfg.starvation_time_weight,
            configured_fanout = cfg.index_fanout,
            "queue config contained out-of-range values, defaults applied"
        );
    }
    Ok(AdQueue::new(normalized))
}

/// [`build_queue`], wrapped for sharing across threads.
pub fn build_shared_queue(cfg: &QueueConfig) -> Result<Arc<AdQueue>, ConfigError> {
    build_queue(cfg).map(Arc::new)
}
