//! Shared harness: an engine wired to a SQLite file the way the daemon wires it

#![allow(dead_code)]

use kvqueue_core::application::{QueueEngine, RecoveryReport, RecoveryService};
use kvqueue_core::error::Result;
use kvqueue_core::port::{BucketStore, SystemTimeProvider, TimestampIdProvider};
use kvqueue_infra_sqlite::{open_store, SqliteBucketStore, StoreConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Node {
    pub engine: Arc<QueueEngine>,
    pub store: SqliteBucketStore,
    pub report: RecoveryReport,
}

impl Node {
    /// Open the database at `path`, run recovery and build an engine
    pub async fn start(path: &Path, ephemeral: bool, strict: bool) -> Result<Self> {
        let config = StoreConfig::new(path.to_string_lossy(), ephemeral);
        let store = open_store(&config).await?;
        let port: Arc<dyn BucketStore> = Arc::new(store.clone());

        let (registry, report) = RecoveryService::new(port.clone(), strict).recover().await?;
        let engine = Arc::new(QueueEngine::new(
            port,
            registry,
            Arc::new(TimestampIdProvider::resuming_after(
                report.newest_message_id.as_deref(),
            )),
            Arc::new(SystemTimeProvider),
        ));

        Ok(Self {
            engine,
            store,
            report,
        })
    }

    pub async fn stop(self) {
        self.store.close().await;
    }
}

/// Temp directory plus the database path inside it
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queues.db");
    (dir, path)
}

/// Write a raw entry, creating the bucket when needed
pub async fn put_raw(store: &SqliteBucketStore, bucket: &str, key: &[u8], value: &[u8]) {
    let mut tx = store.begin().await.unwrap();
    tx.create_bucket_if_not_exists(bucket).await.unwrap();
    tx.put(bucket, key, value).await.unwrap();
    tx.commit().await.unwrap();
}
