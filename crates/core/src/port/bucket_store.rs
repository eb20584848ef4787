// Persistent Store Port (embedded ordered key-value buckets)

use crate::error::Result;
use crate::port::transaction::BucketTransaction;
use async_trait::async_trait;

/// Handle to the embedded store
///
/// The store serializes writers: at most one transaction returned by
/// [`BucketStore::begin`] is alive at a time, later callers wait for it to
/// commit, roll back or drop.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Begin a new read-write transaction
    async fn begin(&self) -> Result<Box<dyn BucketTransaction>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::transaction::{Entry, Transaction};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    type Buckets = BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

    /// In-memory store with the same bucket semantics as the SQLite adapter
    ///
    /// Transactions work on a private copy that replaces the shared state on
    /// commit. `fail_next_commits` makes the next N commits fail after all
    /// writes were staged, which exercises rollback paths in callers.
    #[derive(Clone, Default)]
    pub struct InMemoryBucketStore {
        state: Arc<Mutex<Buckets>>,
        failing_commits: Arc<AtomicUsize>,
        commit_count: Arc<AtomicUsize>,
    }

    impl InMemoryBucketStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_commits(&self, count: usize) {
            self.failing_commits.store(count, Ordering::SeqCst);
        }

        pub fn commit_count(&self) -> usize {
            self.commit_count.load(Ordering::SeqCst)
        }

        /// Copy of the committed entries of `bucket`, `None` if it does not exist
        pub async fn entries(&self, bucket: &str) -> Option<Vec<Entry>> {
            self.state.lock().await.get(bucket).map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
        }

        pub async fn bucket_names(&self) -> Vec<String> {
            self.state.lock().await.keys().cloned().collect()
        }
    }

    #[async_trait]
    impl BucketStore for InMemoryBucketStore {
        async fn begin(&self) -> Result<Box<dyn BucketTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let staged = guard.clone();
            Ok(Box::new(InMemoryTransaction {
                guard,
                staged,
                failing_commits: Arc::clone(&self.failing_commits),
                commit_count: Arc::clone(&self.commit_count),
            }))
        }
    }

    struct InMemoryTransaction {
        guard: OwnedMutexGuard<Buckets>,
        staged: Buckets,
        failing_commits: Arc<AtomicUsize>,
        commit_count: Arc<AtomicUsize>,
    }

    impl InMemoryTransaction {
        fn bucket(&self, bucket: &str) -> Result<&BTreeMap<Vec<u8>, Vec<u8>>> {
            self.staged.get(bucket).ok_or_else(|| missing(bucket))
        }

        fn bucket_mut(&mut self, bucket: &str) -> Result<&mut BTreeMap<Vec<u8>, Vec<u8>>> {
            self.staged.get_mut(bucket).ok_or_else(|| missing(bucket))
        }
    }

    fn missing(bucket: &str) -> AppError {
        AppError::Storage(format!("bucket {} does not exist", bucket))
    }

    #[async_trait]
    impl Transaction for InMemoryTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            let should_fail = self
                .failing_commits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if should_fail {
                return Err(AppError::Storage("injected commit failure".to_string()));
            }

            let staged = std::mem::take(&mut self.staged);
            *self.guard = staged;
            self.commit_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl BucketTransaction for InMemoryTransaction {
        async fn create_bucket_if_not_exists(&mut self, bucket: &str) -> Result<()> {
            self.staged.entry(bucket.to_string()).or_default();
            Ok(())
        }

        async fn bucket_exists(&mut self, bucket: &str) -> Result<bool> {
            Ok(self.staged.contains_key(bucket))
        }

        async fn delete_bucket(&mut self, bucket: &str) -> Result<bool> {
            Ok(self.staged.remove(bucket).is_some())
        }

        async fn list_buckets(&mut self) -> Result<Vec<String>> {
            Ok(self.staged.keys().cloned().collect())
        }

        async fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
            self.bucket_mut(bucket)?.insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        async fn get(&mut self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.bucket(bucket)?.get(key).cloned())
        }

        async fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<bool> {
            Ok(self.bucket_mut(bucket)?.remove(key).is_some())
        }

        async fn scan(&mut self, bucket: &str, limit: Option<usize>) -> Result<Vec<Entry>> {
            let entries = self.bucket(bucket)?;
            Ok(entries
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }

        async fn count(&mut self, bucket: &str) -> Result<u64> {
            Ok(self.bucket(bucket)?.len() as u64)
        }

        async fn last_key(&mut self, bucket: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.bucket(bucket)?.keys().next_back().cloned())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_uncommitted_writes_are_discarded() {
            let store = InMemoryBucketStore::new();

            let mut tx = store.begin().await.unwrap();
            tx.create_bucket_if_not_exists("b").await.unwrap();
            tx.put("b", b"k", b"v").await.unwrap();
            drop(tx);

            assert!(store.entries("b").await.is_none());
        }

        #[tokio::test]
        async fn test_injected_commit_failure() {
            let store = InMemoryBucketStore::new();
            store.fail_next_commits(1);

            let mut tx = store.begin().await.unwrap();
            tx.create_bucket_if_not_exists("b").await.unwrap();
            assert!(tx.commit().await.is_err());

            let mut tx = store.begin().await.unwrap();
            tx.create_bucket_if_not_exists("b").await.unwrap();
            tx.commit().await.unwrap();
            assert_eq!(store.entries("b").await, Some(vec![]));
            assert_eq!(store.commit_count(), 1);
        }

        #[tokio::test]
        async fn test_put_into_missing_bucket_fails() {
            let store = InMemoryBucketStore::new();
            let mut tx = store.begin().await.unwrap();
            let err = tx.put("nope", b"k", b"v").await.unwrap_err();
            assert!(matches!(err, AppError::Storage(_)));
        }
    }
}
