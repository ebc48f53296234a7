//! Sibling ordinal swaps under a per-project lock.
//!
//! Codebooks (and similar per-project lists) carry an ordinal that fixes
//! their display order. A swap is a read-modify-write of two ordinals; two
//! concurrent swaps in the same project could otherwise interleave and leave
//! duplicate ordinals behind. Swaps in different projects do not contend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::errors::{ConcordError, ExError};

/// Storage of ordinals within a scope (a project)
pub trait OrdinalStore {
    /// Current ordinal of `item`
    ///
    /// # Errors
    ///
    /// `NotFound` if the item does not exist in `scope`.
    fn ordinal(&mut self, scope: &str, item: &str) -> Result<u32, ExError>;

    /// Write several ordinals atomically
    ///
    /// # Errors
    ///
    /// Store-specific; nothing is written on failure.
    fn write_ordinals(&mut self, scope: &str, assignments: &[(String, u32)]) -> Result<(), ExError>;
}

/// Registry of per-project ordering locks
#[derive(Debug, Default)]
pub struct ProjectOrderLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectOrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding ordinals of `project_id`
    ///
    /// # Errors
    ///
    /// `Concurrency` if the registry itself was poisoned.
    pub fn lock_for(&self, project_id: &str) -> Result<Arc<Mutex<()>>, ExError> {
        let mut locks = self.locks.lock().map_err(|_| {
            ExError::from(ConcordError::OrderingLockPoisoned {
                project_id: project_id.to_string(),
            })
        })?;
        Ok(Arc::clone(
            locks
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }
}

/// Swap the ordinals of `a` and `b` within `project_id`
///
/// Returns the new ordinals of `(a, b)`.
///
/// # Errors
///
/// - `Concurrency` if the project lock is poisoned
/// - whatever the store reports for unknown items or failed writes
pub fn swap_ordinals<S: OrdinalStore + ?Sized>(
    locks: &ProjectOrderLocks,
    store: &mut S,
    project_id: &str,
    a: &str,
    b: &str,
) -> Result<(u32, u32), ExError> {
    let lock = locks.lock_for(project_id)?;
    let _guard = lock.lock().map_err(|_| {
        ExError::from(ConcordError::OrderingLockPoisoned {
            project_id: project_id.to_string(),
        })
    })?;

    let ordinal_a = store.ordinal(project_id, a)?;
    let ordinal_b = store.ordinal(project_id, b)?;
    if a == b {
        return Ok((ordinal_a, ordinal_b));
    }
    store.write_ordinals(
        project_id,
        &[(a.to_string(), ordinal_b), (b.to_string(), ordinal_a)],
    )?;
    tracing::debug!(project_id, a, b, ordinal_a = ordinal_b, ordinal_b = ordinal_a, "ordinals swapped");
    Ok((ordinal_b, ordinal_a))
}

/// In-memory ordinal store shared between clones
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrdinals {
    inner: Arc<Mutex<BTreeMap<(String, String), u32>>>,
}

impl InMemoryOrdinals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, scope: &str, item: &str, ordinal: u32) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert((scope.to_string(), item.to_string()), ordinal);
        }
    }

    /// Ordinals of `scope`, keyed by item
    pub fn snapshot(&self, scope: &str) -> BTreeMap<String, u32> {
        self.inner
            .lock()
            .map(|map| {
                map.iter()
                    .filter(|((s, _), _)| s == scope)
                    .map(|((_, item), ord)| (item.clone(), *ord))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl OrdinalStore for InMemoryOrdinals {
    fn ordinal(&mut self, scope: &str, item: &str) -> Result<u32, ExError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| ExError::from(ConcordError::OrderingLockPoisoned {
                project_id: scope.to_string(),
            }))?;
        map.get(&(scope.to_string(), item.to_string()))
            .copied()
            .ok_or_else(|| {
                ExError::from(ConcordError::OrderedItemNotFound {
                    item: item.to_string(),
                })
            })
    }

    fn write_ordinals(&mut self, scope: &str, assignments: &[(String, u32)]) -> Result<(), ExError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| ExError::from(ConcordError::OrderingLockPoisoned {
                project_id: scope.to_string(),
            }))?;
        for (item, ordinal) in assignments {
            map.insert((scope.to_string(), item.clone()), *ordinal);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use std::collections::BTreeSet;

    #[test]
    fn test_swap_exchanges_ordinals() {
        let locks = ProjectOrderLocks::new();
        let mut store = InMemoryOrdinals::new();
        store.insert("p1", "sentiment", 0);
        store.insert("p1", "topic", 1);

        let result = swap_ordinals(&locks, &mut store, "p1", "sentiment", "topic").unwrap();
        assert_eq!(result, (1, 0));
        let snap = store.snapshot("p1");
        assert_eq!(snap["sentiment"], 1);
        assert_eq!(snap["topic"], 0);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let locks = ProjectOrderLocks::new();
        let mut store = InMemoryOrdinals::new();
        store.insert("p1", "sentiment", 0);
        let err = swap_ordinals(&locks, &mut store, "p1", "sentiment", "ghost").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(store.snapshot("p1")["sentiment"], 0);
    }

    #[test]
    fn test_same_project_shares_lock() {
        let locks = ProjectOrderLocks::new();
        let a = locks.lock_for("p1").unwrap();
        let b = locks.lock_for("p1").unwrap();
        let c = locks.lock_for("p2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_concurrent_swaps_keep_ordinals_distinct() {
        let locks = Arc::new(ProjectOrderLocks::new());
        let store = InMemoryOrdinals::new();
        let items = ["a", "b", "c", "d"];
        for (i, item) in items.iter().enumerate() {
            store.insert("p1", item, i as u32);
        }

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let locks = Arc::clone(&locks);
                let mut store = store.clone();
                std::thread::spawn(move || {
                    for round in 0..50 {
                        let x = items[(t + round) % items.len()];
                        let y = items[(t + round + 1) % items.len()];
                        swap_ordinals(&locks, &mut store, "p1", x, y).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ordinals: BTreeSet<u32> = store.snapshot("p1").values().copied().collect();
        assert_eq!(ordinals, (0..4).collect());
    }
}
