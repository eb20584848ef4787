// Port Layer - Interfaces for external dependencies

pub mod bucket_store;
pub mod id_provider; // Message ids
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use bucket_store::BucketStore;
pub use id_provider::{IdProvider, TimestampIdProvider};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use transaction::{BucketTransaction, Entry, Transaction};
