//! Local cache for GitHub responses and derived data
//!
//! [`CacheStore`] is the get/set/delete contract every cache backend honors.
//! [`CacheStorage`] persists entries in SQLite (large ones as file blobs);
//! [`MemoryCache`] keeps them in process. Entries expire lazily: an expired
//! entry is only noticed, and removed, when it is read.

pub mod client;
pub mod key;
pub mod memory;
pub mod storage;

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CacheError;

/// Prefix shared by every key this crate writes
pub const CACHE_PREFIX: &str = "repopress_";

/// Fixed TTLs for data whose lifetime does not follow the user preference
pub struct CacheTtl;

impl CacheTtl {
    // Releases change rarely but users expect a fresh tag within the hour
    pub const CHANGELOG: Duration = Duration::from_secs(60 * 60); // 1 hr

    // Verdicts that failed on transport errors should be retried soon
    pub const NEGATIVE_VERDICT: Duration = Duration::from_secs(5 * 60); // 5 min

    // Scraped repository page
    pub const REPO_HTML: Duration = Duration::from_secs(60 * 60); // 1 hr
}

/// Keyed store with per-entry expiry
pub trait CacheStore: Send + Sync {
    /// Value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `data` under `key`, replacing any existing entry.
    fn set(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove one entry. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry written under [`CACHE_PREFIX`].
    fn clear_all(&self) -> Result<usize, CacheError>;
}

/// Read and decode a JSON value; decode failures count as a miss.
pub fn get_json<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    match cache.get(key) {
        Ok(Some(data)) => serde_json::from_slice(&data).ok(),
        Ok(None) => None,
        Err(e) => {
            log::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

/// Encode and store a JSON value. Cache write failures are logged, not raised.
pub fn set_json<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_vec(value) {
        Ok(json) => {
            if let Err(e) = cache.set(key, &json, ttl) {
                log::warn!("Cache write failed for {}: {}", key, e);
            }
        }
        Err(e) => log::warn!("Cache encode failed for {}: {}", key, e),
    }
}

// Re-export main types
pub use client::CachedGitHubClient;
pub use key::{cache_key, token_fingerprint};
pub use memory::MemoryCache;
pub use storage::CacheStorage;
