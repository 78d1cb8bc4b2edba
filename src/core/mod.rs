//! Queue engine, its indices, and error types.

mod bucket;
mod category_index;
pub mod engine;
pub mod error;
pub mod item;
pub mod time_index;

pub use engine::{AdQueue, Distribution, QueueSettings, QueueState, TierShare};
pub use error::{AppResult, QueueError};
pub use item::{Ad, ItemHandle, QueuedAd};
pub use time_index::TimeKey;
