//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use kvqueue_core::domain::{Message, QueueMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire form of a queue's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub created_at: i64,
    pub message_count: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
}

impl From<QueueMetadata> for QueueInfo {
    fn from(meta: QueueMetadata) -> Self {
        Self {
            created_at: meta.created_at,
            message_count: meta.message_count,
            messages_sent: meta.messages_sent,
            messages_received: meta.messages_received,
        }
    }
}

/// Params shared by every method addressing a single queue
#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    pub queue: String,
}

/// queue.list.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQueuesResponse {
    pub queues: BTreeMap<String, QueueInfo>,
}

/// queue.create.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueueResponse {
    pub queue: String,
    pub created: bool,
}

/// queue.delete.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteQueueResponse {
    pub queue: String,
    pub deleted: bool,
}

/// queue.info.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueInfoResponse {
    pub queue: String,
    pub info: QueueInfo,
}

/// message.send.v1
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub queue: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub queue: String,
    pub message_id: String,
}

/// message.receive.v1
///
/// An unknown queue is not an RPC error: the batch is empty, `status` is
/// "error" and `message` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveMessagesResponse {
    pub queue: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub messages: Vec<MessageItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub data: String,
}

impl From<Message> for MessageItem {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            data: msg.data,
        }
    }
}
