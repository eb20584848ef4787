// Startup recovery: rebuild the queue registry from persisted metadata
use crate::application::registry::QueueRegistry;
use crate::domain::{
    message_bucket, queue_for_message_bucket, MessageId, QueueMetadata, QueueName,
    METADATA_BUCKET,
};
use crate::error::Result;
use crate::port::{BucketStore, BucketTransaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What recovery found and fixed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Queues loaded into the registry
    pub loaded: usize,
    /// Records that could not be decoded (left in place)
    pub skipped: Vec<QueueName>,
    /// Queues whose counters were re-derived from the pending messages
    pub reconciled: Vec<QueueName>,
    /// Message buckets deleted because no queue owns them
    pub orphans_removed: Vec<String>,
    /// Greatest pending message id across all message buckets
    pub newest_message_id: Option<MessageId>,
}

/// Recovery service
///
/// Runs once at startup, before the engine serves any request
pub struct RecoveryService {
    store: Arc<dyn BucketStore>,
    strict: bool,
}

impl RecoveryService {
    /// Create a new recovery service
    ///
    /// # Arguments
    /// * `store` - Persistent store to read from
    /// * `strict` - Fail on the first corrupt record instead of skipping it
    ///
    /// # Example
    /// ```ignore
    /// let (registry, report) = RecoveryService::new(store.clone(), false).recover().await?;
    /// let engine = QueueEngine::new(store, registry, ids, clock);
    /// ```
    pub fn new(store: Arc<dyn BucketStore>, strict: bool) -> Self {
        Self { store, strict }
    }

    /// Rebuild the registry
    ///
    /// Algorithm:
    /// 1. Ensure the metadata bucket exists
    /// 2. Decode every metadata record; skip corrupt ones (or fail in strict mode)
    /// 3. Re-derive counters that disagree with the pending message count
    /// 4. Delete message buckets whose queue has no record
    ///
    /// All writes commit in one transaction.
    pub async fn recover(&self) -> Result<(QueueRegistry, RecoveryReport)> {
        info!(strict = self.strict, "Starting queue registry recovery");

        let mut tx = self.store.begin().await?;
        tx.create_bucket_if_not_exists(METADATA_BUCKET).await?;

        let mut report = RecoveryReport::default();
        let mut queues = self.load_records(tx.as_mut(), &mut report).await?;

        Self::reconcile_counters(tx.as_mut(), &mut queues, &mut report).await?;
        Self::remove_orphans(tx.as_mut(), &queues, &mut report).await?;
        report.newest_message_id = Self::newest_message_id(tx.as_mut()).await?;

        tx.commit().await?;

        report.loaded = queues.len();
        report.skipped.sort();
        report.reconciled.sort();

        info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            reconciled = report.reconciled.len(),
            orphans_removed = report.orphans_removed.len(),
            "Queue registry recovery complete"
        );
        Ok((QueueRegistry::from_records(queues), report))
    }

    async fn load_records(
        &self,
        tx: &mut dyn BucketTransaction,
        report: &mut RecoveryReport,
    ) -> Result<HashMap<QueueName, QueueMetadata>> {
        let mut queues = HashMap::new();

        for (key, value) in tx.scan(METADATA_BUCKET, None).await? {
            let name = String::from_utf8_lossy(&key).into_owned();
            match QueueMetadata::from_bytes(&value) {
                Ok(metadata) => {
                    queues.insert(name, metadata);
                }
                Err(e) if self.strict => {
                    error!(queue = %name, error = %e, "Corrupt queue metadata record");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(queue = %name, error = %e, "Skipping corrupt queue metadata record");
                    report.skipped.push(name);
                }
            }
        }

        Ok(queues)
    }

    async fn reconcile_counters(
        tx: &mut dyn BucketTransaction,
        queues: &mut HashMap<QueueName, QueueMetadata>,
        report: &mut RecoveryReport,
    ) -> Result<()> {
        for (name, metadata) in queues.iter_mut() {
            let bucket = message_bucket(name);
            let pending = if tx.bucket_exists(&bucket).await? {
                tx.count(&bucket).await?
            } else {
                0
            };

            let before = metadata.clone();
            if metadata.reconcile(pending) {
                warn!(
                    queue = %name,
                    recorded = before.message_count,
                    pending = pending,
                    "Queue counters disagree with stored messages, re-deriving"
                );
                tx.put(METADATA_BUCKET, name.as_bytes(), &metadata.to_bytes()?)
                    .await?;
                report.reconciled.push(name.clone());
            }
        }
        Ok(())
    }

    async fn remove_orphans(
        tx: &mut dyn BucketTransaction,
        queues: &HashMap<QueueName, QueueMetadata>,
        report: &mut RecoveryReport,
    ) -> Result<()> {
        for bucket in tx.list_buckets().await? {
            let orphaned = match queue_for_message_bucket(&bucket) {
                // Buckets of skipped records are kept so the data can be salvaged
                Some(queue) => {
                    !queues.contains_key(queue) && !report.skipped.iter().any(|s| s == queue)
                }
                None => false,
            };

            if orphaned {
                warn!(bucket = %bucket, "Removing message bucket without a queue");
                tx.delete_bucket(&bucket).await?;
                report.orphans_removed.push(bucket);
            }
        }
        Ok(())
    }

    async fn newest_message_id(tx: &mut dyn BucketTransaction) -> Result<Option<MessageId>> {
        let mut newest: Option<Vec<u8>> = None;
        for bucket in tx.list_buckets().await? {
            if queue_for_message_bucket(&bucket).is_none() {
                continue;
            }
            if let Some(key) = tx.last_key(&bucket).await? {
                if newest.as_ref().map_or(true, |n| key > *n) {
                    newest = Some(key);
                }
            }
        }
        Ok(newest.map(|key| String::from_utf8_lossy(&key).into_owned()))
    }
}
