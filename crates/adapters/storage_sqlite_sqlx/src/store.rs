//! The store handed to the application services.

use sqlx::SqlitePool;

/// `SQLite`-backed implementation of every repository port.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteStore {
    let db = crate::pool::Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .unwrap();
    db.store()
}
