use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes async operations per string key.
///
/// Used to make wallet check-then-append atomic per payer, settlement checks
/// atomic per order, and transitions serialized per payment id. Operations on
/// different keys proceed concurrently.
#[derive(Default, Clone)]
pub struct KeyedMutex {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, creating it on first use.
    ///
    /// The registry mutex is only held while cloning the entry, never while
    /// waiting on the per-key lock.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        entry.lock_owned().await
    }
}
