// Queue Engine - create / delete / send / receive / stat over the bucket store

use crate::application::constants::BATCH_LIMIT;
use crate::application::registry::{QueueRegistry, QueueSlot};
use crate::domain::{
    message_bucket, validate_message, validate_queue_name, Message, MessageId, QueueMetadata,
    QueueName, METADATA_BUCKET,
};
use crate::error::{AppError, Result};
use crate::port::{BucketStore, IdProvider, TimeProvider};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Queue Engine
///
/// Owns the store handle and the registry; build one per process (or per test)
/// and share it behind an `Arc`.
///
/// Locking:
/// - `lifecycle` serializes create/delete against each other.
/// - each queue's exclusion lock serializes send/receive/delete on that queue.
/// - the store serializes write transactions across all queues.
///
/// Every mutation writes messages and metadata in one transaction and only
/// touches in-memory counters after the commit succeeded.
pub struct QueueEngine {
    store: Arc<dyn BucketStore>,
    registry: QueueRegistry,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    lifecycle: Mutex<()>,
}

impl QueueEngine {
    /// Create an engine over a registry produced by `RecoveryService`
    pub fn new(
        store: Arc<dyn BucketStore>,
        registry: QueueRegistry,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            registry,
            id_provider,
            time_provider,
            lifecycle: Mutex::new(()),
        }
    }

    /// All queues with a snapshot of their counters
    pub async fn list(&self) -> BTreeMap<QueueName, QueueMetadata> {
        self.registry.snapshot().await
    }

    /// Counters of one queue (snapshot, no exclusion lock)
    pub async fn info(&self, name: &str) -> Result<QueueMetadata> {
        let slot = self.slot(name).await?;
        Ok(slot.snapshot().await)
    }

    /// Create an empty queue
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty name
    /// - `AlreadyExists` if the name is registered
    /// - `Storage` if the record could not be persisted (nothing is registered then)
    pub async fn create(&self, name: &str) -> Result<QueueMetadata> {
        validate_queue_name(name)?;
        let _lifecycle = self.lifecycle.lock().await;

        if self.registry.contains(name).await {
            return Err(AppError::AlreadyExists(format!(
                "queue {} already exists",
                name
            )));
        }

        let metadata = QueueMetadata::new(self.time_provider.now_millis());
        self.persist_new_queue(name, &metadata)
            .await
            .inspect_err(|e| error!(queue = %name, error = %e, "Failed to persist new queue"))?;

        self.registry.insert(name, metadata.clone()).await;
        info!(queue = %name, created_at = metadata.created_at, "Queue created");
        Ok(metadata)
    }

    async fn persist_new_queue(&self, name: &str, metadata: &QueueMetadata) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.create_bucket_if_not_exists(METADATA_BUCKET).await?;

        // A record recovery could not decode is still owned by that queue
        if tx.get(METADATA_BUCKET, name.as_bytes()).await?.is_some() {
            tx.rollback().await?;
            return Err(AppError::AlreadyExists(format!(
                "queue {} has an unreadable record in the store",
                name
            )));
        }

        tx.put(METADATA_BUCKET, name.as_bytes(), &metadata.to_bytes()?)
            .await?;
        tx.commit().await
    }

    /// Delete a queue, its metadata record and every pending message
    ///
    /// Waits for in-flight send/receive on the queue, then removes both durable
    /// parts in a single transaction.
    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_queue_name(name)?;
        let _lifecycle = self.lifecycle.lock().await;

        let slot = self.slot(name).await?;
        let _exclusive = slot.lock().await;

        let had_messages = self
            .remove_durably(name)
            .await
            .inspect_err(|e| error!(queue = %name, error = %e, "Failed to delete queue"))?;

        self.registry.remove(name).await;
        info!(queue = %name, had_messages, "Queue deleted");
        Ok(())
    }

    /// Drop the metadata record and the message bucket together
    async fn remove_durably(&self, name: &str) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        tx.delete(METADATA_BUCKET, name.as_bytes()).await?;
        let had_messages = tx.delete_bucket(&message_bucket(name)).await?;
        tx.commit().await?;
        Ok(had_messages)
    }

    /// Enqueue a message, returning its generated id
    ///
    /// # Errors
    /// - `NotFound` if the queue is not registered
    /// - `InvalidArgument` for an empty message
    /// - `Storage` if the transaction failed (counters are left untouched)
    pub async fn send(&self, name: &str, data: &str) -> Result<MessageId> {
        let slot = self.slot(name).await?;
        validate_message(data)?;
        let id = self.id_provider.generate_id();

        let _exclusive = slot.lock().await;
        if slot.is_retired() {
            return Err(AppError::queue_not_found(name));
        }

        let mut next = slot.snapshot().await;
        next.record_sent();

        self.persist_message(name, &id, data, &next)
            .await
            .inspect_err(|e| error!(queue = %name, error = %e, "Failed to enqueue message"))?;

        slot.replace(next).await;
        debug!(queue = %name, message_id = %id, "Message enqueued");
        Ok(id)
    }

    async fn persist_message(
        &self,
        name: &str,
        id: &str,
        data: &str,
        next: &QueueMetadata,
    ) -> Result<()> {
        let bucket = message_bucket(name);
        let mut tx = self.store.begin().await?;
        tx.create_bucket_if_not_exists(&bucket).await?;
        tx.put(&bucket, id.as_bytes(), data.as_bytes()).await?;
        tx.put(METADATA_BUCKET, name.as_bytes(), &next.to_bytes()?)
            .await?;
        tx.commit().await
    }

    /// Remove and return up to `BATCH_LIMIT` pending messages in key order
    ///
    /// The deletions and the counter update commit together. On failure nothing
    /// is removed and no message is returned, so a message is handed out at
    /// most once and never lost.
    pub async fn receive(&self, name: &str) -> Result<Vec<Message>> {
        let slot = self.slot(name).await?;

        let _exclusive = slot.lock().await;
        if slot.is_retired() {
            return Err(AppError::queue_not_found(name));
        }

        let current = slot.snapshot().await;
        let (batch, next) = self
            .take_batch(name, current)
            .await
            .inspect_err(|e| error!(queue = %name, error = %e, "Failed to receive messages"))?;

        if let Some(next) = next {
            slot.replace(next).await;
            debug!(queue = %name, count = batch.len(), "Messages received");
        }
        Ok(batch)
    }

    async fn take_batch(
        &self,
        name: &str,
        current: QueueMetadata,
    ) -> Result<(Vec<Message>, Option<QueueMetadata>)> {
        let bucket = message_bucket(name);
        let mut tx = self.store.begin().await?;
        tx.create_bucket_if_not_exists(&bucket).await?;

        // Reaching the batch limit just ends the scan
        let entries = tx.scan(&bucket, Some(BATCH_LIMIT)).await?;
        if entries.is_empty() {
            tx.rollback().await?;
            return Ok((Vec::new(), None));
        }

        let mut batch = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            tx.delete(&bucket, &key).await?;
            batch.push(Message::from_entry(key, value));
        }

        let received = batch.len() as u64;
        let mut next = current;
        if next.record_received(received).is_err() {
            let pending = tx.count(&bucket).await?;
            warn!(
                queue = %name,
                recorded = next.message_count,
                received,
                pending,
                "Queue counters behind stored messages, re-deriving"
            );
            next.messages_received += received;
            next.reconcile(pending);
        }
        tx.put(METADATA_BUCKET, name.as_bytes(), &next.to_bytes()?)
            .await?;
        tx.commit().await?;

        Ok((batch, Some(next)))
    }

    async fn slot(&self, name: &str) -> Result<Arc<QueueSlot>> {
        self.registry
            .get(name)
            .await
            .ok_or_else(|| AppError::queue_not_found(name))
    }
}
