//! Global time index over every admitted record.
//!
//! Keys are `(enqueued_at, sequence)` so entries are unique and totally ordered even when
//! timestamps collide. The index serves age queries and cross-checks bucket membership.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::item::ItemHandle;

/// Ordering key: admission time, then admission sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeKey {
    /// Admission timestamp.
    pub at: DateTime<Utc>,
    /// Admission sequence, breaking ties between equal timestamps.
    pub sequence: u64,
}

impl TimeKey {
    /// Build a key.
    #[must_use]
    pub const fn new(at: DateTime<Utc>, sequence: u64) -> Self {
        Self { at, sequence }
    }

    /// Greatest key at instant `at`.
    const fn last_at(at: DateTime<Utc>) -> Self {
        Self::new(at, u64::MAX)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TimeIndex {
    entries: BTreeMap<TimeKey, ItemHandle>,
}

impl TimeIndex {
    pub(crate) fn insert(&mut self, key: TimeKey, handle: ItemHandle) {
        self.entries.insert(key, handle);
    }

    pub(crate) fn remove(&mut self, key: &TimeKey) -> Option<ItemHandle> {
        self.entries.remove(key)
    }

    pub(crate) fn get(&self, key: &TimeKey) -> Option<ItemHandle> {
        self.entries.get(key).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries with `enqueued_at <= cutoff`, oldest first.
    pub(crate) fn ascending_through(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Iterator<Item = (&TimeKey, ItemHandle)> + '_ {
        self.entries
            .range(..=TimeKey::last_at(cutoff))
            .map(|(key, handle)| (key, *handle))
    }
}
