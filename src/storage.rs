//! Client-side key-value storage
//!
//! The widget never touches ambient storage directly; a `ClientStorage` is
//! injected at construction. `SqliteStorage` persists across runs, and
//! `MemoryStorage` backs tests.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const SESSION_ID_KEY: &str = "chatbot-session-id";
pub const SESSION_CREATED_AT_KEY: &str = "chatbot-session-created-at";
pub const DISMISSED_KEY: &str = "chatbot-dismissed";
pub const AUTO_OPENED_KEY: &str = "chatbot-auto-opened";

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS client_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// get/set/remove over string keys
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Flags are stored as the string `"true"`
    fn get_flag(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.as_deref() == Some("true"))
    }

    fn set_flag(&self, key: &str) -> StorageResult<()> {
        self.set(key, "true")
    }
}

/// Drop the session id, its timestamp and both widget flags
pub fn forget_visitor(storage: &dyn ClientStorage) -> StorageResult<()> {
    for key in [SESSION_ID_KEY, SESSION_CREATED_AT_KEY, DISMISSED_KEY, AUTO_OPENED_KEY] {
        storage.remove(key)?;
    }
    tracing::info!("Forgot stored visitor");
    Ok(())
}

impl<T: ClientStorage + ?Sized> ClientStorage for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

// ============================================================================
// SQLite-backed storage
// ============================================================================

/// Thread-safe storage handle over a single SQLite file
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open or create the storage file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StorageResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&conn)?)
    }
}

impl ClientStorage for SqliteStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM client_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO client_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
        })?;
        tracing::debug!(key, "Stored client value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM client_storage WHERE key = ?1", params![key])
        })?;
        Ok(())
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

#[allow(dead_code)] // Used in tests
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}
