//! `SQLite` implementation of [`OptimizationUnitRepository`].

use sunhash_app::ports::OptimizationUnitRepository;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::OptimizationUnitId;
use sunhash_domain::optimization_unit::OptimizationUnit;

use crate::document::{Document, encode, updated_at};
use crate::error::StorageError;
use crate::store::SqliteStore;

const UPSERT: &str = "INSERT INTO optimization_units (id, name, enabled, data, updated_at) \
     VALUES (?, ?, ?, ?, ?) \
     ON CONFLICT (id) DO UPDATE SET name = excluded.name, enabled = excluded.enabled, \
     data = excluded.data, updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT data FROM optimization_units WHERE id = ?";
const SELECT_ALL: &str = "SELECT data FROM optimization_units ORDER BY name, id";
const DELETE_BY_ID: &str = "DELETE FROM optimization_units WHERE id = ?";

impl OptimizationUnitRepository for SqliteStore {
    async fn get_unit(
        &self,
        id: OptimizationUnitId,
    ) -> Result<Option<OptimizationUnit>, SunHashError> {
        let row: Option<Document<OptimizationUnit>> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::maybe(row))
    }

    async fn list_units(&self) -> Result<Vec<OptimizationUnit>, SunHashError> {
        let rows: Vec<Document<OptimizationUnit>> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::unwrap_all(rows))
    }

    async fn save_unit(&self, unit: OptimizationUnit) -> Result<OptimizationUnit, SunHashError> {
        let data = encode(&unit)?;
        sqlx::query(UPSERT)
            .bind(unit.id.to_string())
            .bind(&unit.name)
            .bind(unit.enabled)
            .bind(&data)
            .bind(updated_at())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(unit)
    }

    async fn delete_unit(&self, id: OptimizationUnitId) -> Result<(), SunHashError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
