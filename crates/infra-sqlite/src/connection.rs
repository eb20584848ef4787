// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use crate::{run_migrations, SqliteBucketStore};
use kvqueue_core::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const IN_MEMORY: &str = ":memory:";

/// Where and how to open the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file path, or `:memory:`
    pub path: String,
    /// Discard any existing database before opening
    pub ephemeral: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<String>, ephemeral: bool) -> Self {
        Self {
            path: path.into(),
            ephemeral,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY, true)
    }

    fn is_in_memory(&self) -> bool {
        is_in_memory(&self.path)
    }
}

fn is_in_memory(path: &str) -> bool {
    path == IN_MEMORY || path == "sqlite::memory:"
}

/// Create SQLite connection pool with WAL mode
///
/// An in-memory database lives inside one connection, so the pool is capped at
/// a single connection in that case.
pub async fn create_pool(path: &str) -> Result<SqlitePool> {
    let in_memory = is_in_memory(path);
    let (options, max_connections) = if in_memory {
        (
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(map_sqlx_error)?,
            1,
        )
    } else {
        (SqliteConnectOptions::new().filename(path), 10)
    };

    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        // Closing the only connection would drop the in-memory database
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

/// Remove a database file together with its WAL and shared-memory siblings
pub fn discard_database(path: &str) -> Result<()> {
    if is_in_memory(path) {
        return Ok(());
    }

    for candidate in [
        path.to_string(),
        format!("{}-wal", path),
        format!("{}-shm", path),
    ] {
        match std::fs::remove_file(&candidate) {
            Ok(()) => info!(file = %candidate, "Discarded persisted state"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(file = %candidate, error = %e, "Failed to discard persisted state");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// Open (and migrate) the store described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<SqliteBucketStore> {
    if config.ephemeral {
        discard_database(&config.path)?;
    }

    if !config.is_in_memory() {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    info!(path = %config.path, ephemeral = config.ephemeral, "Opening store");
    let pool = create_pool(&config.path).await?;
    run_migrations(&pool).await?;

    Ok(SqliteBucketStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool(":memory:").await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_open_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("queues.db");
        let config = StoreConfig::new(path.to_string_lossy(), false);

        open_store(&config).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_discard_missing_database_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        discard_database(&path.to_string_lossy()).unwrap();
        discard_database(":memory:").unwrap();
    }
}
