// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("queue name must not be empty")]
    EmptyQueueName,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("counter underflow: {requested} received but only {pending} pending")]
    CounterUnderflow { requested: u64, pending: u64 },
}

pub type Result<T> = std::result::Result<T, DomainError>;
