//! SQLite-based cache storage with file blob support
//!
//! Stores small responses inline in SQLite, large responses (>10KB, e.g.
//! scraped repository pages) as files. Expiry is checked only when an entry
//! is read; expired entries are removed at that point.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{CACHE_PREFIX, CacheStore};
use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Responses larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024; // 10KB

type Result<T> = std::result::Result<T, CacheError>;

/// SQLite-backed cache storage with file blob support
pub struct CacheStorage {
    conn: Mutex<Connection>,
    blobs_dir: Option<PathBuf>,
}

impl CacheStorage {
    /// Open or create cache storage at the default platform cache location
    pub fn open() -> Result<Self> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Self::open_at(&cache_base.join("repopress"))
    }

    /// Open cache storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let blobs_dir = cache_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            blobs_dir: Some(blobs_dir),
        })
    }

    /// Open a purely in-memory cache (everything stored inline)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            blobs_dir: None,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                data BLOB,
                blob_path TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON cache_entries(expires_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Io("Cache connection lock poisoned".to_string()))
    }

    /// Get cached data if valid; an expired entry is deleted and reported as a miss
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn()?;

        let row: Option<(Option<Vec<u8>>, Option<String>, i64)> = conn
            .query_row(
                "SELECT data, blob_path, expires_at FROM cache_entries WHERE cache_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((data, blob_path, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now {
            log::debug!("Cache entry expired: {}", key);
            conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
            if let Some(blob_path) = blob_path {
                self.remove_blob(&blob_path);
            }
            return Ok(None);
        }

        match (data, blob_path) {
            (Some(data), None) => Ok(Some(data)),
            (None, Some(blob_path)) => match self.read_blob(&blob_path) {
                Some(data) => Ok(Some(data)),
                None => {
                    // Delete stale entry
                    conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    /// Store data with TTL, replacing any existing entry for the key
    pub fn put(&self, key: &str, data: &[u8], ttl: Duration) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let expires = now + ttl.as_millis() as i64;
        let conn = self.conn()?;

        match &self.blobs_dir {
            Some(blobs_dir) if data.len() > INLINE_THRESHOLD => {
                let blob_path = Self::write_blob(blobs_dir, key, data)?;
                conn.execute(
                    "INSERT OR REPLACE INTO cache_entries
                     (cache_key, data, blob_path, created_at, expires_at, size_bytes)
                     VALUES (?1, NULL, ?2, ?3, ?4, ?5)",
                    params![key, blob_path, now, expires, data.len()],
                )?;
            }
            _ => {
                conn.execute(
                    "INSERT OR REPLACE INTO cache_entries
                     (cache_key, data, blob_path, created_at, expires_at, size_bytes)
                     VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
                    params![key, data, now, expires, data.len()],
                )?;
            }
        }
        Ok(())
    }

    /// Delete a specific cache entry by key
    pub fn delete_by_key(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let blob_path: Option<Option<String>> = conn
            .query_row(
                "SELECT blob_path FROM cache_entries WHERE cache_key = ?1",
                [key],
                |r| r.get(0),
            )
            .optional()?;
        let deleted = conn.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        if let Some(Some(blob_path)) = blob_path {
            self.remove_blob(&blob_path);
        }
        Ok(deleted > 0)
    }

    /// Delete every entry whose key starts with `prefix`
    pub fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.conn()?;
        let pattern = format!("{}%", escape_like(prefix));

        let blob_paths: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT blob_path FROM cache_entries
                 WHERE cache_key LIKE ?1 ESCAPE '\\' AND blob_path IS NOT NULL",
            )?;
            let rows = stmt.query_map([&pattern], |r| r.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        let deleted = conn.execute(
            "DELETE FROM cache_entries WHERE cache_key LIKE ?1 ESCAPE '\\'",
            [&pattern],
        )?;

        for blob_path in blob_paths {
            self.remove_blob(&blob_path);
        }
        Ok(deleted)
    }

    /// Write a blob file, sharded by the first 2 chars of the key hash
    fn write_blob(blobs_dir: &Path, key: &str, data: &[u8]) -> Result<String> {
        let hash = key.rsplit('_').next().unwrap_or(key);
        let shard = &hash[..2.min(hash.len())];
        let shard_dir = blobs_dir.join(shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create shard dir: {}", e)))?;

        let filename = format!("{}.bin", key);
        let rel_path = format!("{}/{}", shard, filename);
        let full_path = shard_dir.join(&filename);

        std::fs::write(&full_path, data)
            .map_err(|e| CacheError::Io(format!("Failed to write blob: {}", e)))?;

        Ok(rel_path)
    }

    fn read_blob(&self, rel_path: &str) -> Option<Vec<u8>> {
        let blobs_dir = self.blobs_dir.as_ref()?;
        match std::fs::read(blobs_dir.join(rel_path)) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Failed to read blob {}: {}", rel_path, e);
                None
            }
        }
    }

    fn remove_blob(&self, rel_path: &str) {
        if let Some(blobs_dir) = &self.blobs_dir {
            let _ = std::fs::remove_file(blobs_dir.join(rel_path));
        }
    }

    /// Nuke the cache (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

impl CacheStore for CacheStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        CacheStorage::get(self, key)
    }

    fn set(&self, key: &str, data: &[u8], ttl: Duration) -> Result<()> {
        self.put(key, data, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.delete_by_key(key)
    }

    fn clear_all(&self) -> Result<usize> {
        self.delete_by_prefix(CACHE_PREFIX)
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `\` as escape character
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
