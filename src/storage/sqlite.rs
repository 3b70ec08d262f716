use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::data::DBConnection;
use crate::internal_error::InternalResult;

use super::traits::PrimaryStore;

/// Primary tier backed by a single SQLite table of JSON documents.
pub struct SqliteStore {
    connection: DBConnection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> InternalResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> InternalResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> InternalResult<Self> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            params![],
        )?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

#[async_trait]
impl PrimaryStore for SqliteStore {
    async fn get_item(&self, key: &str) -> InternalResult<Option<Value>> {
        let db_connection = self.connection.lock()?;

        let raw: Option<String> = db_connection
            .query_row(
                "SELECT value FROM records WHERE key = (?1)",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set_item(&self, key: &str, value: &Value) -> InternalResult<()> {
        let text = serde_json::to_string(value)?;
        let db_connection = self.connection.lock()?;

        db_connection.execute(
            "INSERT INTO records (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, text],
        )?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> InternalResult<()> {
        let db_connection = self.connection.lock()?;

        db_connection.execute("DELETE FROM records WHERE key = (?1)", params![key])?;
        Ok(())
    }
}
