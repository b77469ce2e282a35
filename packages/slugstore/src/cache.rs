use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::config::CacheConfig;
use crate::owner::OwnerRef;

/// Derived values memoized per owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedSlug {
    /// Text of the active slug, `None` if the owner has none yet.
    pub slug: Option<String>,
    /// Scope and slug of the active row.
    pub path: Option<String>,
}

/// Read-through cache of each owner's current slug and path.
///
/// Entries are dropped whenever the owner's active row may have changed:
/// after allocation, activation and deletion. Every invalidation advances
/// an epoch; a read that started before an invalidation cannot store its
/// result afterwards.
#[derive(Debug, Default)]
pub struct SlugCache {
    entries: DashMap<OwnerRef, CachedSlug>,
    epoch: AtomicU64,
    disabled: bool,
}

impl SlugCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new()
        } else {
            Self::disabled()
        }
    }

    pub fn get(&self, owner: &OwnerRef) -> Option<CachedSlug> {
        self.entries.get(owner).map(|entry| entry.value().clone())
    }

    /// Taken before reading the database; pass it back to [`Self::insert`].
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Stores `value` unless an invalidation happened since `seen_epoch`.
    /// Returns whether the value was stored.
    pub fn insert(&self, owner: OwnerRef, value: CachedSlug, seen_epoch: u64) -> bool {
        if self.disabled {
            return false;
        }

        // The shard lock orders this check against `invalidate`'s removal.
        let entry = self.entries.entry(owner);
        if self.epoch.load(Ordering::SeqCst) != seen_epoch {
            return false;
        }
        entry.insert(value);
        true
    }

    pub fn invalidate(&self, owner: &OwnerRef) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(owner);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
