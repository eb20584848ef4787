// Transaction port for atomic bucket operations

use crate::error::Result;
use async_trait::async_trait;

/// A raw key/value pair as stored in a bucket
pub type Entry = (Vec<u8>, Vec<u8>);

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Bucket operations within a read-write transaction
///
/// Buckets are named collections of key/value pairs kept in ascending byte
/// order of key. Entry operations against a missing bucket fail with
/// `AppError::Storage`; create the bucket first.
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait BucketTransaction: Transaction {
    /// Create `bucket` unless it already exists
    async fn create_bucket_if_not_exists(&mut self, bucket: &str) -> Result<()>;

    async fn bucket_exists(&mut self, bucket: &str) -> Result<bool>;

    /// Delete `bucket` and every entry in it. Returns false if it did not exist.
    async fn delete_bucket(&mut self, bucket: &str) -> Result<bool>;

    /// Names of all buckets, sorted
    async fn list_buckets(&mut self) -> Result<Vec<String>>;

    /// Insert or overwrite an entry
    async fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;

    async fn get(&mut self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove an entry. Returns false if the key was absent.
    async fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<bool>;

    /// Entries in key order, stopping after `limit` when given
    async fn scan(&mut self, bucket: &str, limit: Option<usize>) -> Result<Vec<Entry>>;

    /// Number of entries in `bucket`
    async fn count(&mut self, bucket: &str) -> Result<u64>;

    /// Greatest key in `bucket`, `None` when it is empty
    async fn last_key(&mut self, bucket: &str) -> Result<Option<Vec<u8>>>;
}
