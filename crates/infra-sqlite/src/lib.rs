// kvqueue Infrastructure - SQLite Adapter
// Implements: BucketStore, BucketTransaction

mod bucket_store;
mod connection;
mod error;
mod migration;
mod transaction;

pub use bucket_store::SqliteBucketStore;
pub use connection::{create_pool, discard_database, open_store, StoreConfig};
pub use migration::run_migrations;
pub use transaction::SqliteBucketTransaction;

// Note: sqlx::Error conversion is handled by a helper function (error::map_sqlx_error)
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
