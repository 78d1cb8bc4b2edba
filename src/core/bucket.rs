//! Per-tier FIFO bucket, linked through the arena.

use std::collections::BTreeMap;

use crate::core::item::{Arena, ItemHandle};
use crate::core::time_index::TimeKey;

/// Doubly linked sequence of records for one tier, ascending by `(enqueued_at, sequence)`.
///
/// Links live in the arena nodes. The bucket keeps its endpoints plus a per-tier position
/// map so ordered insertion finds its anchor in O(log n) without touching other tiers.
#[derive(Debug, Default, Clone)]
pub(crate) struct PriorityBucket {
    head: Option<ItemHandle>,
    tail: Option<ItemHandle>,
    positions: BTreeMap<TimeKey, ItemHandle>,
}

impl PriorityBucket {
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    pub(crate) const fn front(&self) -> Option<ItemHandle> {
        self.head
    }

    pub(crate) const fn back(&self) -> Option<ItemHandle> {
        self.tail
    }

    pub(crate) fn push_back(&mut self, arena: &mut Arena, handle: ItemHandle) {
        arena[handle].prev = self.tail;
        arena[handle].next = None;
        match self.tail {
            Some(tail) => arena[tail].next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.positions.insert(arena[handle].record.key(), handle);
    }

    pub(crate) fn push_front(&mut self, arena: &mut Arena, handle: ItemHandle) {
        arena[handle].prev = None;
        arena[handle].next = self.head;
        match self.head {
            Some(head) => arena[head].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
        self.positions.insert(arena[handle].record.key(), handle);
    }

    /// Splice `handle` right after `anchor`, which must already be in this bucket.
    pub(crate) fn insert_after(
        &mut self,
        arena: &mut Arena,
        anchor: ItemHandle,
        handle: ItemHandle,
    ) {
        let next = arena[anchor].next;
        arena[handle].prev = Some(anchor);
        arena[handle].next = next;
        arena[anchor].next = Some(handle);
        match next {
            Some(next) => arena[next].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.positions.insert(arena[handle].record.key(), handle);
    }

    /// Place an unlinked record by key. Empty buckets and keys past the tail append
    /// directly; anything else goes after its nearest predecessor in this tier.
    pub(crate) fn insert_ordered(&mut self, arena: &mut Arena, handle: ItemHandle) {
        let key = arena[handle].record.key();
        let after_tail = self.tail.is_none_or(|tail| arena[tail].record.key() < key);
        if after_tail {
            self.push_back(arena, handle);
            return;
        }
        let anchor = self.positions.range(..key).next_back().map(|(_, &h)| h);
        match anchor {
            Some(anchor) => self.insert_after(arena, anchor, handle),
            None => self.push_front(arena, handle),
        }
    }

    pub(crate) fn pop_front(&mut self, arena: &mut Arena) -> Option<ItemHandle> {
        let head = self.head?;
        self.remove(arena, head);
        Some(head)
    }

    /// Unlink `handle`, which must be in this bucket.
    pub(crate) fn remove(&mut self, arena: &mut Arena, handle: ItemHandle) {
        let (prev, next) = {
            let node = &mut arena[handle];
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(prev) => arena[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => arena[next].prev = prev,
            None => self.tail = prev,
        }
        self.positions.remove(&arena[handle].record.key());
    }

    /// Handles front to back.
    pub(crate) fn iter<'a>(&self, arena: &'a Arena) -> BucketIter<'a> {
        BucketIter {
            arena,
            cursor: self.head,
        }
    }
}

pub(crate) struct BucketIter<'a> {
    arena: &'a Arena,
    cursor: Option<ItemHandle>,
}

impl Iterator for BucketIter<'_> {
    type Item = ItemHandle;

    fn next(&mut self) -> Option<ItemHandle> {
        let current = self.cursor?;
        self.cursor = self.arena.get(current).and_then(|node| node.next);
        Some(current)
    }
}
