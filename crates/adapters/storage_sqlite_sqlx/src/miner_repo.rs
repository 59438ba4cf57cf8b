//! `SQLite` implementation of [`MinerRepository`].

use sunhash_app::ports::MinerRepository;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::MinerId;
use sunhash_domain::miner::Miner;

use crate::document::{Document, encode, updated_at};
use crate::error::StorageError;
use crate::store::SqliteStore;

const UPSERT: &str = "INSERT INTO miners (id, name, status, active, data, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?) \
     ON CONFLICT (id) DO UPDATE SET name = excluded.name, status = excluded.status, \
     active = excluded.active, data = excluded.data, updated_at = excluded.updated_at";
const SELECT_BY_ID: &str = "SELECT data FROM miners WHERE id = ?";
const SELECT_ALL: &str = "SELECT data FROM miners ORDER BY name, id";
const DELETE_BY_ID: &str = "DELETE FROM miners WHERE id = ?";

impl MinerRepository for SqliteStore {
    async fn get_miner(&self, id: MinerId) -> Result<Option<Miner>, SunHashError> {
        let row: Option<Document<Miner>> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::maybe(row))
    }

    async fn list_miners(&self) -> Result<Vec<Miner>, SunHashError> {
        let rows: Vec<Document<Miner>> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Document::unwrap_all(rows))
    }

    async fn save_miner(&self, miner: Miner) -> Result<Miner, SunHashError> {
        let data = encode(&miner)?;
        sqlx::query(UPSERT)
            .bind(miner.id.to_string())
            .bind(&miner.name)
            .bind(miner.status.to_string())
            .bind(miner.active)
            .bind(&data)
            .bind(updated_at())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(miner)
    }

    async fn delete_miner(&self, id: MinerId) -> Result<(), SunHashError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
