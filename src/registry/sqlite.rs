//! SQLite registry backend
//!
//! One row per tracked repository; the record itself is stored as JSON so
//! fields written by newer versions survive a round trip through older ones.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{RegistryBackend, TrackedPackage};
use crate::error::RegistryError;

const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, RegistryError>;

/// Default registry backend
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Open or create `registry.db` inside `dir`
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| RegistryError::Storage(format!("Failed to create registry dir: {}", e)))?;
        let conn = Connection::open(dir.join("registry.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracked_packages (
                repo_key TEXT PRIMARY KEY NOT NULL,
                kind TEXT NOT NULL,
                record TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RegistryError::Storage("Registry connection lock poisoned".to_string()))
    }
}

fn decode(json: &str) -> Result<TrackedPackage> {
    serde_json::from_str(json).map_err(|e| RegistryError::Storage(format!("Corrupt record: {}", e)))
}

impl RegistryBackend for SqliteRegistry {
    fn load(&self, key: &str) -> Result<Option<TrackedPackage>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM tracked_packages WHERE repo_key = ?1",
                [key],
                |r| r.get(0),
            )
            .optional()?;
        json.as_deref().map(decode).transpose()
    }

    fn store(&self, record: &TrackedPackage) -> Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| RegistryError::Storage(format!("Failed to encode record: {}", e)))?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO tracked_packages (repo_key, kind, record, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.key(),
                record.kind.as_str(),
                json,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tracked_packages WHERE repo_key = ?1", [key])?;
        Ok(deleted > 0)
    }

    fn list(&self) -> Result<Vec<TrackedPackage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT record FROM tracked_packages ORDER BY repo_key")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            records.push(decode(&json?)?);
        }
        Ok(records)
    }
}
