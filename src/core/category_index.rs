//! Category → members index used for bulk re-keying.

use std::collections::{HashMap, HashSet};

use crate::core::item::ItemHandle;

#[derive(Debug, Default)]
pub(crate) struct CategoryIndex {
    members: HashMap<String, HashSet<ItemHandle>>,
}

impl CategoryIndex {
    pub(crate) fn insert(&mut self, category: &str, handle: ItemHandle) {
        self.members
            .entry(category.to_owned())
            .or_default()
            .insert(handle);
    }

    /// Drop `handle` from `category`; empty categories are removed entirely.
    pub(crate) fn remove(&mut self, category: &str, handle: ItemHandle) -> bool {
        let Some(set) = self.members.get_mut(category) else {
            return false;
        };
        let removed = set.remove(&handle);
        if set.is_empty() {
            self.members.remove(category);
        }
        removed
    }

    pub(crate) fn members(&self, category: &str) -> Option<&HashSet<ItemHandle>> {
        self.members.get(category)
    }

    /// Number of categories with at least one member.
    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// Total handles across all categories.
    pub(crate) fn handle_count(&self) -> usize {
        self.members.values().map(HashSet::len).sum()
    }
}
