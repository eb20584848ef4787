// SQLite BucketStore Implementation

use crate::error::map_sqlx_error;
use crate::SqliteBucketTransaction;
use async_trait::async_trait;
use kvqueue_core::error::Result;
use kvqueue_core::port::{BucketStore, BucketTransaction};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Buckets stored in two tables (`buckets`, `entries`) of one SQLite database
///
/// SQLite itself allows one writer at a time, but a deferred transaction that
/// upgrades to a write lock can fail with SQLITE_BUSY instead of waiting. The
/// `writer` gate queues writers in-process so transactions never race for the
/// lock.
#[derive(Clone)]
pub struct SqliteBucketStore {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl SqliteBucketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections (flushes the WAL on the last one)
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BucketStore for SqliteBucketStore {
    async fn begin(&self) -> Result<Box<dyn BucketTransaction>> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteBucketTransaction::new(tx, writer)))
    }
}
