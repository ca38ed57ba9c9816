use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A mutex that locks on a key rather than globally. The intake pipeline
/// locks on the final filename, so two concurrent uploads of `report.pdf`
/// serialize against each other while uploads of distinct names proceed in
/// parallel.
#[derive(Debug, Clone)]
pub struct KeyedMutex {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Acquires the lock for the given key. The lock is released when the
    /// returned guard is dropped.
    pub async fn lock(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        // The inner Arc<Mutex> stays alive in the map, so the owned guard
        // remains valid after this entry reference is dropped. Entries are
        // never evicted; the set of distinct filenames seen by one bot
        // process is small.
        mutex.lock_owned().await
    }
}

impl Default for KeyedMutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = KeyedMutex::new();
        let in_section = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_section = Arc::clone(&in_section);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("report.pdf").await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedMutex::new();
        let _a = locks.lock("a.pdf").await;
        // Would deadlock if keys shared a lock.
        let _b = locks.lock("b.pdf").await;
    }
}
