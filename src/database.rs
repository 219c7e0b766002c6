use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Database connection lock was poisoned")]
    LockPoisoned,
}

/// Durable key-value storage for serialized collections.
///
/// Values are opaque text to the backend; the store writes the JSON
/// encoding of a whole collection under each key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if it was never written
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Insert or replace the value for `key`
    async fn set(&self, key: &str, value: String) -> Result<(), DatabaseError>;

    /// Write several keys. Backends that can should make this atomic.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), DatabaseError> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    /// Remove every key
    async fn clear(&self) -> Result<(), DatabaseError>;
}

/// SQLite-backed key-value store
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        log::debug!("Opened database at {}", db_path.display());
        Self::with_connection(conn)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Database { conn: Mutex::new(conn) };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.lock()?.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    fn upsert(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        Ok(())
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        Self::upsert(&conn, key, &value)?;
        log::debug!("Wrote {} bytes to '{}'", value.len(), key);
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for (key, value) in &entries {
            Self::upsert(&tx, key, value)?;
        }
        tx.commit()?;
        log::debug!("Wrote {} keys in one transaction", entries.len());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM kv_store", [])?;
        log::info!("Cleared {} stored collections", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("@plant_care_plants").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites_value() {
        let db = Database::open_in_memory().unwrap();
        db.set("k", "[1]".to_string()).await.unwrap();
        db.set("k", "[1,2]".to_string()).await.unwrap();
        assert_eq!(db.get("k").await.unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(db.keys().unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_set_many_and_clear() {
        let db = Database::open_in_memory().unwrap();
        db.set_many(vec![
            ("a".to_string(), "[]".to_string()),
            ("b".to_string(), "[{}]".to_string()),
        ])
        .await
        .unwrap();
        assert_eq!(db.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        db.clear().await.unwrap();
        assert!(db.keys().unwrap().is_empty());
        assert_eq!(db.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plants.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new(path).unwrap();
            db.set("k", "value".to_string()).await.unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("value"));
    }
}
