use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = super::init_database(db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = super::init_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// The connection must already carry the `kv_store` table.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )
            .map(|_| ())
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| conn.execute("DELETE FROM kv_store WHERE key = ?1", [key]).map(|_| ()))
    }
}

#[derive(Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_store_overwrites_and_removes() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        assert_eq!(store.get("slot").unwrap(), None);

        store.set("slot", "first").unwrap();
        store.set("slot", "second").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("second"));

        store.remove("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
        // removing an absent key is not an error
        store.remove("slot").unwrap();
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKvStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }
}
