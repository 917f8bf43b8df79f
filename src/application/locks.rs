//! Per-mindmap serialisation of load/compute/write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::domain::MindmapId;

/// Registry of one mutex per mindmap.
///
/// Mutations of the same mindmap run one after another; different mindmaps
/// do not block each other.
#[derive(Debug, Default)]
pub struct MindmapLocks {
    locks: Mutex<HashMap<MindmapId, Arc<Mutex<()>>>>,
}

impl MindmapLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<MindmapId, Arc<Mutex<()>>>> {
        // The guarded data is (), so a poisoned lock carries no broken state.
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, mindmap_id: MindmapId) -> Arc<Mutex<()>> {
        Arc::clone(self.registry().entry(mindmap_id).or_default())
    }

    /// Drop the registry entry once no other caller holds or waits for it.
    fn release(&self, mindmap_id: MindmapId, handle: Arc<Mutex<()>>) {
        let mut locks = self.registry();
        let idle = locks
            .get(&mindmap_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &handle) && Arc::strong_count(&handle) == 2);
        if idle {
            locks.remove(&mindmap_id);
            trace!("released lock entry of mindmap {}", mindmap_id);
        }
    }

    /// Run `f` while holding the lock of `mindmap_id`.
    pub fn with_lock<T>(&self, mindmap_id: MindmapId, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(mindmap_id);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            trace!("locked mindmap {}", mindmap_id);
            f()
        };
        self.release(mindmap_id, handle);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn given_same_mindmap_when_locking_concurrently_then_sections_do_not_overlap() {
        let locks = Arc::new(MindmapLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let (locks, inside, max_inside) =
                    (Arc::clone(&locks), Arc::clone(&inside), Arc::clone(&max_inside));
                thread::spawn(move || {
                    locks.with_lock(MindmapId(1), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_different_mindmaps_when_locking_then_independent_handles() {
        let locks = MindmapLocks::new();
        let nested = locks.with_lock(MindmapId(1), || locks.with_lock(MindmapId(2), || 42));
        assert_eq!(nested, 42);
    }

    #[test]
    fn given_many_mindmaps_when_locks_released_then_registry_is_empty() {
        let locks = MindmapLocks::new();
        for id in 0..100 {
            locks.with_lock(MindmapId(id), || ());
        }
        let inside = locks.with_lock(MindmapId(1), || locks.registry().len());

        assert_eq!(inside, 1);
        assert!(locks.registry().is_empty());
    }

    #[test]
    fn given_waiting_caller_when_holder_releases_then_entry_is_kept_for_waiter() {
        let locks = Arc::new(MindmapLocks::new());
        let holder = locks.handle(MindmapId(1));

        // A second handle stands in for a caller queued on the same mutex.
        locks.release(MindmapId(1), Arc::clone(&holder));
        assert_eq!(locks.registry().len(), 1);

        locks.release(MindmapId(1), holder);
        assert!(locks.registry().is_empty());
    }
}
