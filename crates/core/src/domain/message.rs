// Message Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Message ID (zero-padded nanosecond timestamp, see `TimestampIdProvider`)
pub type MessageId = String;

/// A pending message as stored in its queue's message bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub data: String,
}

impl Message {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }

    /// Build a message from a raw bucket entry (key = id, value = data)
    pub fn from_entry(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            id: String::from_utf8_lossy(&key).into_owned(),
            data: String::from_utf8_lossy(&value).into_owned(),
        }
    }
}

pub fn validate_message(data: &str) -> Result<()> {
    if data.is_empty() {
        return Err(DomainError::EmptyMessage);
    }
    Ok(())
}
