//! `SQLite` implementation of [`EnergySourceRepository`].

use sunhash_app::ports::EnergySourceRepository;
use sunhash_domain::energy::EnergySource;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::EnergySourceId;

use crate::document::{Document, encode, updated_at};
use crate::error::StorageError;
use crate::store::SqliteStore;

const UPSERT: &str = "INSERT INTO energy_sources (id, name, data, updated_at) VALUES (?, ?, ?, ?) \
     ON CONFLICT (id) DO UPDATE SET name = excluded.name, data = excluded.data, \
     updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT data FROM energy_sources WHERE id = ?";
const SELECT_ALL: &str = "SELECT data FROM energy_sources ORDER BY name, id";
const DELETE_BY_ID: &str = "DELETE FROM energy_sources WHERE id = ?";

impl EnergySourceRepository for SqliteStore {
    async fn get_energy_source(
        &self,
        id: EnergySourceId,
    ) -> Result<Option<EnergySource>, SunHashError> {
        let row: Option<Document<EnergySource>> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::maybe(row))
    }

    async fn list_energy_sources(&self) -> Result<Vec<EnergySource>, SunHashError> {
        let rows: Vec<Document<EnergySource>> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::unwrap_all(rows))
    }

    async fn save_energy_source(&self, source: EnergySource) -> Result<EnergySource, SunHashError> {
        let data = encode(&source)?;
        sqlx::query(UPSERT)
            .bind(source.id.to_string())
            .bind(&source.name)
            .bind(&data)
            .bind(updated_at())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(source)
    }

    async fn delete_energy_source(&self, id: EnergySourceId) -> Result<(), SunHashError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
