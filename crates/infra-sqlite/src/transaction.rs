// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use kvqueue_core::error::{AppError, Result};
use kvqueue_core::port::{BucketTransaction, Entry, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use tokio::sync::OwnedMutexGuard;

/// Read-write transaction; holds the store's writer gate until it ends
pub struct SqliteBucketTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
}

impl SqliteBucketTransaction {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>, writer: OwnedMutexGuard<()>) -> Self {
        Self {
            tx,
            _writer: writer,
        }
    }

    async fn require_bucket(&mut self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            Ok(())
        } else {
            Err(AppError::Storage(format!("bucket {} does not exist", bucket)))
        }
    }
}

#[async_trait]
impl Transaction for SqliteBucketTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl BucketTransaction for SqliteBucketTransaction {
    async fn create_bucket_if_not_exists(&mut self, bucket: &str) -> Result<()> {
        sqlx::query("INSERT INTO buckets (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(bucket)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn bucket_exists(&mut self, bucket: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buckets WHERE name = ?")
            .bind(bucket)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    async fn delete_bucket(&mut self, bucket: &str) -> Result<bool> {
        // Entries first; does not rely on the FK cascade being enabled
        sqlx::query("DELETE FROM entries WHERE bucket = ?")
            .bind(bucket)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM buckets WHERE name = ?")
            .bind(bucket)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_buckets(&mut self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM buckets ORDER BY name")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.require_bucket(bucket).await?;

        sqlx::query(
            r#"
            INSERT INTO entries (bucket, key, value) VALUES (?, ?, ?)
            ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(bucket)
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&mut self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.require_bucket(bucket).await?;

        sqlx::query_scalar("SELECT value FROM entries WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&mut self, bucket: &str, key: &[u8]) -> Result<bool> {
        self.require_bucket(bucket).await?;

        let result = sqlx::query("DELETE FROM entries WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan(&mut self, bucket: &str, limit: Option<usize>) -> Result<Vec<Entry>> {
        self.require_bucket(bucket).await?;

        // LIMIT -1 means no limit in SQLite
        let limit = limit
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        sqlx::query_as::<_, (Vec<u8>, Vec<u8>)>(
            "SELECT key, value FROM entries WHERE bucket = ? ORDER BY key ASC LIMIT ?",
        )
        .bind(bucket)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn count(&mut self, bucket: &str) -> Result<u64> {
        self.require_bucket(bucket).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE bucket = ?")
            .bind(bucket)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }

    async fn last_key(&mut self, bucket: &str) -> Result<Option<Vec<u8>>> {
        self.require_bucket(bucket).await?;

        sqlx::query_scalar("SELECT key FROM entries WHERE bucket = ? ORDER BY key DESC LIMIT 1")
            .bind(bucket)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }
}
