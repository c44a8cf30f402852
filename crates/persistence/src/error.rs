//! Translation of database errors into store errors.

use domain::StoreError;

/// Maps a SQLx error onto the store error the domain understands.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => StoreError::AlreadyExists,
            // foreign_key_violation
            Some("23503") => StoreError::NotFound,
            _ => StoreError::Backend(format!("Database error: {}", db_err)),
        },
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        other => StoreError::Backend(format!("Database error: {}", other)),
    }
}
