// Queue Registry - in-memory view of every live queue

use crate::domain::{QueueMetadata, QueueName};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Registry entry for one queue
///
/// `exclusion` serializes send/receive on this queue for the whole durable
/// transaction plus the counter update. `metadata` is only ever locked briefly,
/// so stat/list snapshots never wait on the store.
pub struct QueueSlot {
    metadata: RwLock<QueueMetadata>,
    exclusion: Mutex<()>,
    retired: AtomicBool,
}

impl QueueSlot {
    fn new(metadata: QueueMetadata) -> Self {
        Self {
            metadata: RwLock::new(metadata),
            exclusion: Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// Acquire the per-queue exclusion lock
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.exclusion.lock().await
    }

    /// Copy of the current counters
    pub async fn snapshot(&self) -> QueueMetadata {
        self.metadata.read().await.clone()
    }

    /// Install counters that were just committed to the store
    pub async fn replace(&self, metadata: QueueMetadata) {
        *self.metadata.write().await = metadata;
    }

    /// True once the queue was deleted; checked after taking the exclusion lock
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

/// Mapping from queue name to its slot
#[derive(Default)]
pub struct QueueRegistry {
    queues: RwLock<HashMap<QueueName, Arc<QueueSlot>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from recovered records
    pub fn from_records(records: HashMap<QueueName, QueueMetadata>) -> Self {
        let queues = records
            .into_iter()
            .map(|(name, metadata)| (name, Arc::new(QueueSlot::new(metadata))))
            .collect();
        Self {
            queues: RwLock::new(queues),
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<QueueSlot>> {
        self.queues.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.queues.read().await.contains_key(name)
    }

    /// Register a queue. Returns false (and changes nothing) if the name is taken.
    pub async fn insert(&self, name: &str, metadata: QueueMetadata) -> bool {
        let mut queues = self.queues.write().await;
        if queues.contains_key(name) {
            return false;
        }
        queues.insert(name.to_string(), Arc::new(QueueSlot::new(metadata)));
        true
    }

    /// Unregister a queue and mark its slot retired
    ///
    /// Callers holding the slot's exclusion lock keep it; anyone waiting on the
    /// lock sees `is_retired()` once they get it.
    pub async fn remove(&self, name: &str) -> Option<Arc<QueueSlot>> {
        let slot = self.queues.write().await.remove(name)?;
        slot.retire();
        Some(slot)
    }

    /// Point-in-time copy of every queue's counters, sorted by name
    pub async fn snapshot(&self) -> BTreeMap<QueueName, QueueMetadata> {
        let slots: Vec<(QueueName, Arc<QueueSlot>)> = self
            .queues
            .read()
            .await
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();

        let mut snapshot = BTreeMap::new();
        for (name, slot) in slots {
            snapshot.insert(name, slot.snapshot().await);
        }
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.queues.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queues.read().await.is_empty()
    }
}
