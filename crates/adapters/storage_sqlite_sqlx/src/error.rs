//! Storage-specific error type wrapping sqlx errors.

use sunhash_domain::error::SunHashError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize an aggregate into its JSON document.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for SunHashError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
