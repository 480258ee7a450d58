use parking_lot::RwLock;
use std::sync::Arc;

use crate::types::{FlagEvaluationResult, FlagSnapshot};

/// The runtime's cached snapshot.
///
/// Readers clone an `Arc` to the current map and never see a partial update:
/// every write either swaps the whole map or swaps in a copy with one entry
/// changed, under the write lock.
#[derive(Default)]
pub struct SnapshotCache {
    current: RwLock<Arc<FlagSnapshot>>,
}

impl SnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current map. Later writes do not affect the returned value.
    pub fn snapshot(&self) -> Arc<FlagSnapshot> {
        Arc::clone(&*self.current.read())
    }

    /// Clone of the cached result for `key`.
    pub fn get(&self, key: &str) -> Option<FlagEvaluationResult> {
        self.current.read().get(key).cloned()
    }

    /// Whether `key` is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.current.read().contains_key(key)
    }

    /// Unconditionally swaps in `next`.
    pub fn replace(&self, next: FlagSnapshot) -> Arc<FlagSnapshot> {
        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);
        next
    }

    /// Swaps in `next` only if it differs from the cached map.
    ///
    /// Returns the new map when a swap happened.
    pub fn replace_if_changed(&self, next: FlagSnapshot) -> Option<Arc<FlagSnapshot>> {
        let mut current = self.current.write();
        if !snapshot_differs(&**current, &next) {
            return None;
        }
        let next = Arc::new(next);
        *current = Arc::clone(&next);
        Some(next)
    }

    /// Replaces or inserts the single entry for `result.flag_key`.
    pub fn patch(&self, result: FlagEvaluationResult) -> Arc<FlagSnapshot> {
        let mut current = self.current.write();
        let mut next = FlagSnapshot::clone(&**current);
        next.insert(result.flag_key.clone(), result);
        let next = Arc::new(next);
        *current = Arc::clone(&next);
        next
    }

    /// Drop every entry.
    pub fn clear(&self) {
        *self.current.write() = Arc::new(FlagSnapshot::new());
    }
}

/// Structural diff: size change, or any key whose value differs or is missing.
pub fn snapshot_differs(previous: &FlagSnapshot, next: &FlagSnapshot) -> bool {
    previous.len() != next.len()
        || next
            .iter()
            .any(|(key, result)| previous.get(key) != Some(result))
}
