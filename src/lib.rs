//! # Prometheus Ad Queue
//!
//! An in-memory, tiered admission queue for ad processing work on the Prometheus AI
//! Platform. Ads are served in strict tier order, except when an ad has waited past its
//! own tolerance: anti-starvation scheduling then lets it jump ahead of fresher, higher
//! tier work.
//!
//! ## Core Problem Solved
//!
//! A plain priority heap answers "what is next" but nothing else. Operators of the ad
//! pipeline also need to:
//!
//! - **Bulk re-key** every ad of a category (or every ad older than a cutoff) to another tier
//! - **Look ahead** at the next `n` ads without consuming them
//! - **Query by age** to find ads that have been waiting too long
//! - **Inspect backlog** per tier
//!
//! The engine keeps three indices over a single arena of records (per-tier buckets, a
//! global time index, and a category index) and updates them together under one lock.
//!
//! ## Key Features
//!
//! - **Strict FIFO within a tier**: ordered by `(enqueued_at, sequence)`, never ambiguous
//! - **Anti-starvation**: starved tier heads compete on a weighted score across all tiers
//! - **Deterministic lookahead**: `peek` reproduces exactly what `dequeue` would return
//! - **Order-preserving re-keying**: moved ads are spliced in by time, not appended
//! - **Backfill**: admission with an explicit timestamp lands in the right position
//!
//! ## Example
//!
//! ```
//! use prometheus_ad_queue::config::QueueConfig;
//! use prometheus_ad_queue::core::{Ad, AdQueue};
//!
//! let queue = AdQueue::new(
//!     QueueConfig::new()
//!         .with_total_tiers(3)
//!         .with_anti_starvation(true)
//!         .with_max_wait_seconds(600),
//! );
//!
//! queue.enqueue(Ad::new("ad-1", "puzzle", 1, 600));
//! queue.enqueue(Ad::new("ad-2", "racing", 3, 600));
//!
//! let next = queue.dequeue().expect("queue has items");
//! assert_eq!(next.ad.id, "ad-2");
//! assert_eq!(queue.len(), 1);
//! ```
//!
//! For request/response handling at a transport boundary, see [`runtime::api`].

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Queue engine, its indices, and error types.
pub mod core;
/// Configuration models and loaders.
pub mod config;
/// Builders to construct queues from configuration.
pub mod builders;
/// Request/response surface for transport adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
