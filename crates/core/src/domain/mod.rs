// Domain Layer - Pure business logic and entities

pub mod error;
pub mod message;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use message::{validate_message, Message, MessageId};
pub use queue::{
    message_bucket, queue_for_message_bucket, validate_queue_name, QueueMetadata, QueueName,
    MESSAGE_BUCKET_SUFFIX, METADATA_BUCKET,
};
