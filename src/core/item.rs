//! Ad payloads, admitted records, and the slot arena that owns them.
//!
//! Every index in the engine refers to records through [`ItemHandle`]s into a single
//! [`Arena`]. Bucket links (`prev`/`next`) live next to the record in its arena node, so
//! splicing a record in or out of a tier never touches the other indices.

use std::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time_index::TimeKey;

/// An ad submitted for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    /// Caller-supplied identifier.
    #[serde(alias = "adId")]
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Grouping key used for bulk re-keying.
    #[serde(alias = "gameFamily")]
    pub category: String,
    /// Audience tags; informational only.
    #[serde(default, alias = "targetAudience")]
    pub audience: Vec<String>,
    /// Priority tier. Higher tiers are served first.
    #[serde(alias = "priority")]
    pub tier: i64,
    /// Opaque creation label supplied by the producer. Not used for ordering.
    #[serde(default, alias = "createdAt")]
    pub created_label: String,
    /// Longest tolerable wait before the ad counts as starved.
    #[serde(default, alias = "maxWaitTime")]
    pub max_wait_seconds: u64,
}

impl Ad {
    /// Create an ad with the scheduling fields set and empty display fields.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        tier: i64,
        max_wait_seconds: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            category: category.into(),
            audience: Vec::new(),
            tier,
            created_label: String::new(),
            max_wait_seconds,
        }
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the audience tags.
    #[must_use]
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    /// Set the opaque creation label.
    #[must_use]
    pub fn with_created_label(mut self, label: impl Into<String>) -> Self {
        self.created_label = label.into();
        self
    }
}

/// An ad as admitted by the queue, with its scheduling metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAd {
    /// The ad, with tier and max wait already normalized.
    #[serde(flatten)]
    pub ad: Ad,
    /// Admission timestamp.
    pub enqueued_at: DateTime<Utc>,
    /// Admission sequence number; unique and increasing.
    pub sequence: u64,
}

impl QueuedAd {
    /// Ordering key shared by the tier buckets and the time index.
    #[must_use]
    pub const fn key(&self) -> TimeKey {
        TimeKey::new(self.enqueued_at, self.sequence)
    }
}

/// Stable handle to a record in the [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle(usize);

/// Arena slot: a record plus its links within its tier bucket.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) record: QueuedAd,
    pub(crate) prev: Option<ItemHandle>,
    pub(crate) next: Option<ItemHandle>,
}

/// Slot arena owning every admitted record. Freed slots are recycled.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    len: usize,
}

impl Arena {
    /// Store an unlinked record and return its handle.
    pub(crate) fn insert(&mut self, record: QueuedAd) -> ItemHandle {
        let node = Node {
            record,
            prev: None,
            next: None,
        };
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            ItemHandle(slot)
        } else {
            self.slots.push(Some(node));
            ItemHandle(self.slots.len() - 1)
        }
    }

    /// Release a slot, returning its record. The caller must have unlinked it first.
    pub(crate) fn remove(&mut self, handle: ItemHandle) -> Option<QueuedAd> {
        let node = self.slots.get_mut(handle.0)?.take()?;
        self.free.push(handle.0);
        self.len -= 1;
        Some(node.record)
    }

    pub(crate) fn get(&self, handle: ItemHandle) -> Option<&Node> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Mutable access to every live record, in slot order.
    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut QueuedAd> {
        self.slots.iter_mut().flatten().map(|node| &mut node.record)
    }
}

impl Index<ItemHandle> for Arena {
    type Output = Node;

    fn index(&self, handle: ItemHandle) -> &Node {
        match self.slots.get(handle.0) {
            Some(Some(node)) => node,
            _ => panic!("stale item handle {}", handle.0),
        }
    }
}

impl IndexMut<ItemHandle> for Arena {
    fn index_mut(&mut self, handle: ItemHandle) -> &mut Node {
        match self.slots.get_mut(handle.0) {
            Some(Some(node)) => node,
            _ => panic!("stale item handle {}", handle.0),
        }
    }
}
