use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub mod kv;
pub mod schema;

pub use kv::{KeyValueStore, MemoryKvStore, SqliteKvStore};

pub fn init_database(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;

    // Enable WAL mode
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    schema::create_tables(&conn)?;
    Ok(conn)
}
