// sqlx::Error -> AppError mapping

use kvqueue_core::error::AppError;

// Every SQL failure is a storage failure; keep the SQLite result code visible
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) if code == "5" => AppError::Storage(format!(
                "Database locked (SQLITE_BUSY): {}",
                db_err.message()
            )),
            Some(code) if code == "13" => {
                AppError::Storage(format!("Database full: {}", db_err.message()))
            }
            Some(code) => AppError::Storage(format!(
                "Database error [{}]: {}",
                code,
                db_err.message()
            )),
            None => AppError::Storage(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::Io(io_err) => AppError::Storage(format!("Database I/O error: {}", io_err)),
        // Connection, pool, protocol errors
        _ => AppError::Storage(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    #[tokio::test]
    async fn test_sql_errors_carry_sqlite_code() {
        let pool = create_pool(":memory:").await.unwrap();

        let err = sqlx::query("SELECT * FROM no_such_table")
            .execute(&pool)
            .await
            .unwrap_err();
        match map_sqlx_error(err) {
            AppError::Storage(msg) => {
                assert!(msg.starts_with("Database error [1]"), "{}", msg);
                assert!(msg.contains("no_such_table"), "{}", msg);
            }
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_pool_is_storage_error() {
        let pool = create_pool(":memory:").await.unwrap();
        pool.close().await;

        let err = pool.begin().await.unwrap_err();
        assert!(matches!(map_sqlx_error(err), AppError::Storage(_)));
    }
}
