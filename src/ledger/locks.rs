use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ledger::keys::StorageKey;

/// One mutex per storage key. Holding a key's lock across a
/// read-modify-write keeps two writers of the same row from clobbering
/// each other; different keys never wait on one another.
///
/// A key's slot lives only while someone holds or waits for it.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<StorageKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn slots(&self) -> MutexGuard<'_, HashMap<StorageKey, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<T>(&self, key: &StorageKey, f: impl FnOnce() -> T) -> T {
        let slot = Arc::clone(self.slots().entry(key.clone()).or_default());
        let out = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        // Clones are only taken under the map lock, so the count can't grow here.
        let mut slots = self.slots();
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::keys::Category;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_key_runs_one_at_a_time() {
        let locks = KeyLocks::default();
        let key = StorageKey::collection(Some("u1"), Category::Daily);
        let inside = AtomicUsize::new(0);
        let overlap = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        locks.with(&key, || {
                            if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlap.fetch_add(1, Ordering::SeqCst);
                            }
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert!(locks.slots().is_empty());
    }

    #[test]
    fn idle_keys_are_dropped() {
        let locks = KeyLocks::default();
        for week in 1..=5 {
            let key = StorageKey::new(
                Some("u1"),
                Category::Daily,
                Some(crate::ledger::keys::Secondary::Week(week)),
            );
            assert_eq!(locks.with(&key, || locks.slots().len()), 1);
        }
        assert!(locks.slots().is_empty());
    }
}
