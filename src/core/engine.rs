//! Queue engine: tier buckets, time index and category index under one lock.
//!
//! [`AdQueue`] is the public, thread-safe handle. Each operation locks the whole
//! [`QueueState`] for its full duration, so callers always observe the three indices in
//! agreement:
//!
//! 1. a record is in a tier bucket iff it is in the time index under the same key;
//! 2. a bucketed record is in exactly the category set of its current category;
//! 3. tiers are within `1..=total_tiers` and per-ad max waits never exceed the global cap;
//! 4. buckets are ascending by `(enqueued_at, sequence)`;
//! 5. sequence numbers are unique and increase with admission order.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::core::bucket::PriorityBucket;
use crate::core::category_index::CategoryIndex;
use crate::core::item::{Ad, Arena, ItemHandle, QueuedAd};
use crate::core::time_index::TimeIndex;
use crate::util::clock;

/// Backlog share of one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierShare {
    /// Tier number.
    pub tier: i64,
    /// Ads currently waiting in the tier.
    pub count: usize,
    /// Share of the total backlog, 0..=100. Zero when the queue is empty.
    pub percent: f64,
}

/// Backlog distribution across tiers, highest tier first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    /// Total ads waiting.
    pub total: usize,
    /// One entry per tier, descending.
    pub tiers: Vec<TierShare>,
    /// Whether anti-starvation is currently on.
    pub anti_starvation_enabled: bool,
}

impl Distribution {
    /// Share for a single tier.
    #[must_use]
    pub fn tier(&self, tier: i64) -> Option<&TierShare> {
        self.tiers.iter().find(|share| share.tier == tier)
    }
}

/// Snapshot of the engine's policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettings {
    /// Number of tiers; tier `total_tiers` is served first.
    pub total_tiers: i64,
    /// Anti-starvation flag.
    pub anti_starvation_enabled: bool,
    /// Global cap on per-ad max wait.
    pub max_wait_seconds: u64,
    /// Multiplier on the wait term of the starvation score.
    pub starvation_time_weight: f64,
    /// Time index fan-out hint.
    pub index_fanout: usize,
}

/// How an admission finds its place in the tier bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Timestamp is "now": append at the tail.
    Append,
    /// Arbitrary timestamp: ordered insertion through the time index.
    Ordered,
}

/// Unsynchronized engine state. [`AdQueue`] wraps it in a mutex.
#[derive(Debug)]
pub struct QueueState {
    arena: Arena,
    /// `buckets[tier - 1]`.
    buckets: Vec<PriorityBucket>,
    time_index: TimeIndex,
    categories: CategoryIndex,
    total_tiers: i64,
    anti_starvation: bool,
    max_wait_seconds: u64,
    time_weight: f64,
    index_fanout: usize,
    next_sequence: u64,
}

/// Bucket slot for a normalized tier.
fn slot(tier: i64) -> usize {
    usize::try_from(tier - 1).unwrap_or_default()
}

fn is_starved(elapsed: TimeDelta, max_wait_seconds: u64) -> bool {
    i64::try_from(max_wait_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .is_some_and(|limit| elapsed >= limit)
}

impl QueueState {
    /// Build empty state from configuration. Out-of-range settings fall back to defaults.
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        let config = config.normalized();
        let tiers = slot(config.total_tiers) + 1;
        Self {
            arena: Arena::default(),
            buckets: vec![PriorityBucket::default(); tiers],
            time_index: TimeIndex::default(),
            categories: CategoryIndex::default(),
            total_tiers: config.total_tiers,
            anti_starvation: config.enable_anti_starvation,
            max_wait_seconds: config.max_wait_seconds,
            time_weight: config.starvation_time_weight,
            index_fanout: config.index_fanout,
            next_sequence: 0,
        }
    }

    /// Clamp a requested tier into `1..=total_tiers`.
    #[must_use]
    pub fn normalize_tier(&self, tier: i64) -> i64 {
        tier.clamp(1, self.total_tiers)
    }

    /// Number of admitted ads.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no ads are waiting.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Current policy settings.
    #[must_use]
    pub const fn settings(&self) -> QueueSettings {
        QueueSettings {
            total_tiers: self.total_tiers,
            anti_starvation_enabled: self.anti_starvation,
            max_wait_seconds: self.max_wait_seconds,
            starvation_time_weight: self.time_weight,
            index_fanout: self.index_fanout,
        }
    }

    /// Admit an ad stamped with `at`, assumed to be the current time.
    pub fn enqueue(&mut self, ad: Ad, at: DateTime<Utc>) -> QueuedAd {
        self.admit(ad, at, Placement::Append)
    }

    /// Admit an ad with an arbitrary timestamp (backfill/replay).
    pub fn enqueue_at(&mut self, ad: Ad, at: DateTime<Utc>) -> QueuedAd {
        self.admit(ad, at, Placement::Ordered)
    }

    fn admit(&mut self, mut ad: Ad, at: DateTime<Utc>, placement: Placement) -> QueuedAd {
        let requested = ad.tier;
        ad.tier = self.normalize_tier(requested);
        if ad.tier != requested {
            warn!(ad_id = %ad.id, requested, tier = ad.tier, "tier out of range, clamped");
        }
        if ad.max_wait_seconds > self.max_wait_seconds {
            debug!(
                ad_id = %ad.id,
                requested = ad.max_wait_seconds,
                cap = self.max_wait_seconds,
                "max wait capped"
            );
            ad.max_wait_seconds = self.max_wait_seconds;
        }

        self.next_sequence += 1;
        let record = QueuedAd {
            ad,
            enqueued_at: at,
            sequence: self.next_sequence,
        };
        let key = record.key();
        let tier = record.ad.tier;
        let handle = self.arena.insert(record.clone());

        let bucket = &mut self.buckets[slot(tier)];
        let in_order = bucket
            .back()
            .is_none_or(|tail| self.arena[tail].record.key() < key);
        if placement == Placement::Append && in_order {
            bucket.push_back(&mut self.arena, handle);
        } else {
            self.insert_ordered(handle, tier);
        }
        self.time_index.insert(key, handle);
        self.categories.insert(&record.ad.category, handle);
        record
    }

    /// Splice an unlinked record into `tier` at its key position.
    fn insert_ordered(&mut self, handle: ItemHandle, tier: i64) {
        self.buckets[slot(tier)].insert_ordered(&mut self.arena, handle);
    }

    /// Move a record to `target`, keeping its key. Returns `false` if it was already there.
    fn move_to_tier(&mut self, handle: ItemHandle, target: i64) -> bool {
        let current = self.arena[handle].record.ad.tier;
        if current == target {
            return false;
        }
        self.buckets[slot(current)].remove(&mut self.arena, handle);
        self.arena[handle].record.ad.tier = target;
        self.insert_ordered(handle, target);
        true
    }

    fn starvation_score(&self, tier: i64, elapsed: TimeDelta) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (tier, cap) = (tier as f64, self.max_wait_seconds.max(1) as f64);
        tier + clock::elapsed_secs(elapsed) / cap * self.time_weight
    }

    /// Pick the tier to serve next given each tier's current head.
    ///
    /// Without anti-starvation this is the highest non-empty tier. With it, every starved
    /// head competes on its starvation score and the best one wins over strict priority;
    /// equal scores keep the higher tier.
    fn select_tier<F>(&self, now: DateTime<Utc>, head_of: F) -> Option<i64>
    where
        F: Fn(i64) -> Option<ItemHandle>,
    {
        let mut fallback = None;
        let mut starved: Option<(f64, i64)> = None;
        for tier in (1..=self.total_tiers).rev() {
            let Some(head) = head_of(tier) else {
                continue;
            };
            if fallback.is_none() {
                fallback = Some(tier);
                if !self.anti_starvation {
                    break;
                }
            }
            let record = &self.arena[head].record;
            let elapsed = now - record.enqueued_at;
            if !is_starved(elapsed, record.ad.max_wait_seconds) {
                continue;
            }
            let score = self.starvation_score(tier, elapsed);
            if starved.is_none_or(|(best, _)| score > best) {
                starved = Some((score, tier));
            }
        }
        starved.map(|(_, tier)| tier).or(fallback)
    }

    /// Remove and return the next ad, or `None` when every tier is empty.
    pub fn dequeue(&mut self, now: DateTime<Utc>) -> Option<QueuedAd> {
        let buckets = &self.buckets;
        let tier = self.select_tier(now, |tier| buckets[slot(tier)].front())?;
        let handle = self.buckets[slot(tier)].pop_front(&mut self.arena)?;
        let record = self.arena.remove(handle)?;
        self.time_index.remove(&record.key());
        self.categories.remove(&record.ad.category, handle);
        Some(record)
    }

    /// The next `n` ads in dequeue order, evaluated at a single instant, without mutation.
    #[must_use]
    pub fn peek(&self, n: usize, now: DateTime<Utc>) -> Vec<QueuedAd> {
        let mut cursors: Vec<Option<ItemHandle>> =
            self.buckets.iter().map(PriorityBucket::front).collect();
        let mut out = Vec::with_capacity(n.min(self.len()));
        while out.len() < n {
            let Some(tier) = self.select_tier(now, |tier| cursors[slot(tier)]) else {
                break;
            };
            let cursor = &mut cursors[slot(tier)];
            if let Some(handle) = *cursor {
                let node = &self.arena[handle];
                out.push(node.record.clone());
                *cursor = node.next;
            }
        }
        out
    }

    /// Move every ad of `category` to `tier`. Returns how many moved.
    pub fn reprioritize_by_category(&mut self, category: &str, tier: i64) -> usize {
        let target = self.normalize_tier(tier);
        let Some(members) = self.categories.members(category) else {
            return 0;
        };
        let mut handles: Vec<ItemHandle> = members.iter().copied().collect();
        handles.sort_unstable_by_key(|&handle| self.arena[handle].record.key());
        handles
            .into_iter()
            .filter(|&handle| self.move_to_tier(handle, target))
            .count()
    }

    /// Move every ad waiting at least `age` as of `now` to `tier`. Returns how many moved.
    pub fn reprioritize_by_age(
        &mut self,
        age: std::time::Duration,
        tier: i64,
        now: DateTime<Utc>,
    ) -> usize {
        let target = self.normalize_tier(tier);
        let Some(cutoff) = clock::cutoff_before(now, age) else {
            return 0;
        };
        let candidates: Vec<ItemHandle> = self
            .time_index
            .ascending_through(cutoff)
            .map(|(_, handle)| handle)
            .filter(|&handle| self.arena[handle].record.ad.tier != target)
            .collect();
        candidates
            .into_iter()
            .filter(|&handle| self.move_to_tier(handle, target))
            .count()
    }

    /// Ads waiting at least `age` as of `now`, oldest first.
    #[must_use]
    pub fn waiting_longer_than(
        &self,
        age: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Vec<QueuedAd> {
        let Some(cutoff) = clock::cutoff_before(now, age) else {
            return Vec::new();
        };
        self.time_index
            .ascending_through(cutoff)
            .map(|(_, handle)| self.arena[handle].record.clone())
            .collect()
    }

    /// Per-tier backlog, highest tier first.
    #[must_use]
    pub fn distribution(&self) -> Distribution {
        let total = self.len();
        let tiers = (1..=self.total_tiers)
            .rev()
            .map(|tier| {
                let count = self.buckets[slot(tier)].len();
                #[allow(clippy::cast_precision_loss)]
                let percent = if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                };
                TierShare {
                    tier,
                    count,
                    percent,
                }
            })
            .collect();
        Distribution {
            total,
            tiers,
            anti_starvation_enabled: self.anti_starvation,
        }
    }

    /// Toggle anti-starvation for subsequent dequeue/peek calls.
    pub fn set_anti_starvation(&mut self, enabled: bool) {
        self.anti_starvation = enabled;
    }

    /// Replace the global cap and lower every admitted ad's max wait to it.
    /// Returns how many ads were lowered.
    pub fn set_max_wait_seconds(&mut self, cap: u64) -> usize {
        self.max_wait_seconds = cap;
        let mut lowered = 0;
        for record in self.arena.records_mut() {
            if record.ad.max_wait_seconds > cap {
                record.ad.max_wait_seconds = cap;
                lowered += 1;
            }
        }
        lowered
    }

    /// Ads in `tier`, front to back.
    #[must_use]
    pub fn tier_contents(&self, tier: i64) -> Vec<QueuedAd> {
        if tier < 1 || tier > self.total_tiers {
            return Vec::new();
        }
        self.buckets[slot(tier)]
            .iter(&self.arena)
            .map(|handle| self.arena[handle].record.clone())
            .collect()
    }

    /// Verify the cross-index invariants. Used by tests.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut bucketed = 0;
        for tier in 1..=self.total_tiers {
            let bucket = &self.buckets[slot(tier)];
            let mut previous = None;
            let mut walked = 0;
            for handle in bucket.iter(&self.arena) {
                let record = &self.arena[handle].record;
                let key = record.key();
                if record.ad.tier != tier {
                    return Err(format!(
                        "{} in bucket {tier} but tagged {}",
                        record.ad.id, record.ad.tier
                    ));
                }
                if previous.is_some_and(|prev| prev >= key) {
                    return Err(format!("bucket {tier} out of order at {}", record.ad.id));
                }
                if record.ad.max_wait_seconds > self.max_wait_seconds {
                    return Err(format!("{} exceeds max wait cap", record.ad.id));
                }
                if self.time_index.get(&key) != Some(handle) {
                    return Err(format!("{} missing from time index", record.ad.id));
                }
                let in_category = self
                    .categories
                    .members(&record.ad.category)
                    .is_some_and(|set| set.contains(&handle));
                if !in_category {
                    return Err(format!("{} missing from category index", record.ad.id));
                }
                previous = Some(key);
                walked += 1;
            }
            if walked != bucket.len() {
                return Err(format!("bucket {tier} length {} but walked {walked}", bucket.len()));
            }
            bucketed += walked;
        }
        let categorized = self.categories.handle_count();
        let stored = self.len();
        if bucketed != stored || self.time_index.len() != stored || categorized != stored {
            return Err(format!(
                "membership mismatch: {bucketed} bucketed, {} indexed, \
                 {categorized} categorized, {} stored (over {} categories)",
                self.time_index.len(),
                stored,
                self.categories.len()
            ));
        }
        Ok(())
    }
}

/// Thread-safe ad queue. Every operation runs under one exclusive lock.
#[derive(Debug)]
pub struct AdQueue {
    state: Mutex<QueueState>,
}

impl AdQueue {
    /// Create an empty queue from configuration.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let state = QueueState::new(&config);
        let settings = state.settings();
        info!(
            total_tiers = settings.total_tiers,
            anti_starvation = settings.anti_starvation_enabled,
            max_wait_seconds = settings.max_wait_seconds,
            starvation_time_weight = settings.starvation_time_weight,
            index_fanout = settings.index_fanout,
            "ad queue initialized"
        );
        Self {
            state: Mutex::new(state),
        }
    }

    /// Admit an ad timestamped now; appended at the tail of its tier.
    pub fn enqueue(&self, ad: Ad) -> QueuedAd {
        let record = self.state.lock().enqueue(ad, clock::now());
        debug!(
            ad_id = %record.ad.id,
            tier = record.ad.tier,
            sequence = record.sequence,
            "ad enqueued"
        );
        record
    }

    /// Admit an ad with an explicit timestamp; placed by time within its tier.
    pub fn enqueue_at(&self, ad: Ad, at: DateTime<Utc>) -> QueuedAd {
        let record = self.state.lock().enqueue_at(ad, at);
        debug!(
            ad_id = %record.ad.id,
            tier = record.ad.tier,
            sequence = record.sequence,
            enqueued_at = %record.enqueued_at,
            "ad enqueued with explicit time"
        );
        record
    }

    /// Remove and return the next ad.
    pub fn dequeue(&self) -> Option<QueuedAd> {
        self.dequeue_at(clock::now())
    }

    /// Remove and return the next ad as of `now`.
    pub fn dequeue_at(&self, now: DateTime<Utc>) -> Option<QueuedAd> {
        let record = self.state.lock().dequeue(now);
        match &record {
            Some(record) => debug!(ad_id = %record.ad.id, tier = record.ad.tier, "ad dequeued"),
            None => debug!("queue empty, nothing to dequeue"),
        }
        record
    }

    /// The next `n` ads in the order [`dequeue`](Self::dequeue) would return them.
    #[must_use]
    pub fn peek(&self, n: usize) -> Vec<QueuedAd> {
        self.peek_at(n, clock::now())
    }

    /// [`peek`](Self::peek) evaluated at `now`.
    #[must_use]
    pub fn peek_at(&self, n: usize, now: DateTime<Utc>) -> Vec<QueuedAd> {
        let records = self.state.lock().peek(n, now);
        debug!(requested = n, returned = records.len(), "peeked");
        records
    }

    /// Move every ad of `category` to `tier` (clamped). Unknown categories are a no-op.
    pub fn reprioritize_by_category(&self, category: &str, tier: i64) -> usize {
        let moved = self.state.lock().reprioritize_by_category(category, tier);
        info!(category, tier, moved, "reprioritized by category");
        moved
    }

    /// Move every ad waiting at least `age` to `tier` (clamped).
    pub fn reprioritize_by_age(&self, age: std::time::Duration, tier: i64) -> usize {
        self.reprioritize_by_age_at(age, tier, clock::now())
    }

    /// [`reprioritize_by_age`](Self::reprioritize_by_age) evaluated at `now`.
    pub fn reprioritize_by_age_at(
        &self,
        age: std::time::Duration,
        tier: i64,
        now: DateTime<Utc>,
    ) -> usize {
        let moved = self.state.lock().reprioritize_by_age(age, tier, now);
        info!(age_secs = age.as_secs_f64(), tier, moved, "reprioritized by age");
        moved
    }

    /// Ads that have waited at least `age`, oldest first.
    #[must_use]
    pub fn waiting_longer_than(&self, age: std::time::Duration) -> Vec<QueuedAd> {
        self.waiting_longer_than_at(age, clock::now())
    }

    /// [`waiting_longer_than`](Self::waiting_longer_than) evaluated at `now`.
    #[must_use]
    pub fn waiting_longer_than_at(
        &self,
        age: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Vec<QueuedAd> {
        self.state.lock().waiting_longer_than(age, now)
    }

    /// Backlog per tier.
    #[must_use]
    pub fn distribution(&self) -> Distribution {
        self.state.lock().distribution()
    }

    /// Enable or disable anti-starvation.
    pub fn set_anti_starvation(&self, enabled: bool) {
        self.state.lock().set_anti_starvation(enabled);
        info!(enabled, "anti-starvation updated");
    }

    /// Whether anti-starvation is enabled.
    #[must_use]
    pub fn anti_starvation_enabled(&self) -> bool {
        self.state.lock().settings().anti_starvation_enabled
    }

    /// Set the global max-wait cap, lowering admitted ads above it.
    pub fn set_max_wait_seconds(&self, cap: u64) {
        let lowered = self.state.lock().set_max_wait_seconds(cap);
        info!(cap, lowered, "maximum wait updated");
    }

    /// Current global max-wait cap.
    #[must_use]
    pub fn max_wait_seconds(&self) -> u64 {
        self.state.lock().settings().max_wait_seconds
    }

    /// Current policy settings.
    #[must_use]
    pub fn settings(&self) -> QueueSettings {
        self.state.lock().settings()
    }

    /// Ads in `tier`, front to back.
    #[must_use]
    pub fn tier_contents(&self, tier: i64) -> Vec<QueuedAd> {
        self.state.lock().tier_contents(tier)
    }

    /// Number of admitted ads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Verify the cross-index invariants. Used by tests.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> Result<(), String> {
        self.state.lock().check_invariants()
    }
}
