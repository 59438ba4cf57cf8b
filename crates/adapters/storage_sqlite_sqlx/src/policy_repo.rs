//! `SQLite` implementation of [`PolicyRepository`].
//!
//! Rules and clauses live inside the policy document. A policy is stored
//! as given: rules that fail validation are kept so the engine can report
//! them instead of losing them silently.

use sunhash_app::ports::PolicyRepository;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::PolicyId;
use sunhash_domain::policy::OptimizationPolicy;

use crate::document::{Document, encode, updated_at};
use crate::error::StorageError;
use crate::store::SqliteStore;

const UPSERT: &str = "INSERT INTO policies (id, name, data, updated_at) VALUES (?, ?, ?, ?) \
     ON CONFLICT (id) DO UPDATE SET name = excluded.name, data = excluded.data, \
     updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT data FROM policies WHERE id = ?";
const SELECT_ALL: &str = "SELECT data FROM policies ORDER BY name, id";
const DELETE_BY_ID: &str = "DELETE FROM policies WHERE id = ?";

impl PolicyRepository for SqliteStore {
    async fn get_policy(&self, id: PolicyId) -> Result<Option<OptimizationPolicy>, SunHashError> {
        let row: Option<Document<OptimizationPolicy>> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::maybe(row))
    }

    async fn list_policies(&self) -> Result<Vec<OptimizationPolicy>, SunHashError> {
        let rows: Vec<Document<OptimizationPolicy>> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::unwrap_all(rows))
    }

    async fn save_policy(
        &self,
        policy: OptimizationPolicy,
    ) -> Result<OptimizationPolicy, SunHashError> {
        let data = encode(&policy)?;
        sqlx::query(UPSERT)
            .bind(policy.id.to_string())
            .bind(&policy.name)
            .bind(&data)
            .bind(updated_at())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(policy)
    }

    async fn delete_policy(&self, id: PolicyId) -> Result<(), SunHashError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
