// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue identifier (externally supplied, non-empty)
pub type QueueName = String;

/// Bucket holding one metadata record per queue
pub const METADATA_BUCKET: &str = "queues";

/// Suffix that turns a queue name into the name of its message bucket
pub const MESSAGE_BUCKET_SUFFIX: &str = "-messages";

/// Reject empty names; any other string is a valid queue name
pub fn validate_queue_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DomainError::EmptyQueueName);
    }
    Ok(())
}

/// Name of the bucket holding the pending messages of `queue`
pub fn message_bucket(queue: &str) -> String {
    format!("{}{}", queue, MESSAGE_BUCKET_SUFFIX)
}

/// Inverse of [`message_bucket`]; `None` for buckets that are not message buckets
pub fn queue_for_message_bucket(bucket: &str) -> Option<&str> {
    bucket
        .strip_suffix(MESSAGE_BUCKET_SUFFIX)
        .filter(|queue| !queue.is_empty())
}

/// Persisted per-queue record
///
/// Plain value: the exclusion lock guarding updates lives in the registry slot,
/// so the record can be cloned and serialized freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetadata {
    pub created_at: i64, // epoch ms
    pub message_count: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
}

impl QueueMetadata {
    /// Fresh record with all counters at zero
    pub fn new(created_at: i64) -> Self {
        Self {
            created_at,
            message_count: 0,
            messages_sent: 0,
            messages_received: 0,
        }
    }

    pub fn record_sent(&mut self) {
        self.message_count += 1;
        self.messages_sent += 1;
    }

    /// Account for `count` messages removed by a receive
    pub fn record_received(&mut self, count: u64) -> Result<()> {
        let remaining = self
            .message_count
            .checked_sub(count)
            .ok_or(DomainError::CounterUnderflow {
                requested: count,
                pending: self.message_count,
            })?;
        self.message_count = remaining;
        self.messages_received += count;
        Ok(())
    }

    /// `message_count == messages_sent - messages_received`
    pub fn is_consistent(&self) -> bool {
        self.messages_sent.checked_sub(self.messages_received) == Some(self.message_count)
    }

    /// Re-derive counters from the number of entries actually pending in the store.
    ///
    /// Lifetime counters only ever move forward: when the record claims more
    /// messages than are pending the difference is booked as received, otherwise
    /// the missing sends are added.
    ///
    /// Returns `true` when the record changed.
    pub fn reconcile(&mut self, pending: u64) -> bool {
        if self.message_count == pending && self.is_consistent() {
            return false;
        }

        self.message_count = pending;
        let expected_sent = self.messages_received + pending;
        if self.messages_sent >= expected_sent {
            self.messages_received = self.messages_sent - pending;
        } else {
            self.messages_sent = expected_sent;
        }
        true
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
