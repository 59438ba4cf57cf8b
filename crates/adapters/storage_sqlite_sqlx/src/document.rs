//! JSON document column shared by every table.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::error::StorageError;

/// Row wrapper decoding the `data` column into an aggregate.
pub(crate) struct Document<T>(pub T);

impl<T> Document<T> {
    pub fn maybe(value: Option<Self>) -> Option<T> {
        value.map(|d| d.0)
    }

    pub fn unwrap_all(values: Vec<Self>) -> Vec<T> {
        values.into_iter().map(|d| d.0).collect()
    }
}

impl<'r, T: DeserializeOwned> FromRow<'r, SqliteRow> for Document<T> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let data: String = row.try_get("data")?;
        serde_json::from_str(&data)
            .map(Self)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn updated_at() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
