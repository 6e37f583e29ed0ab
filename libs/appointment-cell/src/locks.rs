use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-appointment mutual exclusion. Two concurrent mutating operations on
/// the same appointment id must not interleave between reading the current
/// status and updating the reminder, so every lifecycle mutation holds the
/// id's lock across the whole read-validate-write-reminder sequence.
pub struct IdLockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl IdLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for IdLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn serializes_critical_sections_per_id() {
        let registry = Arc::new(IdLockRegistry::new());
        let id = Uuid::new_v4();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_flight = Arc::clone(&in_flight);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire(id).await;
                let concurrent = in_flight.fetch_add(1, Ordering::SeqCst);
                assert_eq!(concurrent, 0, "two tasks inside the same id's lock");
                tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn different_ids_do_not_block_each_other() {
        let registry = IdLockRegistry::new();
        let _a = registry.acquire(Uuid::new_v4()).await;
        // Would deadlock if ids shared a lock.
        let _b = registry.acquire(Uuid::new_v4()).await;
    }
}
