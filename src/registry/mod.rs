//! Tracked package registry
//!
//! Durable `owner/repo → TrackedPackage` map. The periodic update check and
//! the installer both write records, so every write goes through
//! [`RegistryStore`], which serializes read-modify-write per key.

mod sqlite;
mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::package::{PackageKind, RepoRef};

pub use sqlite::SqliteRegistry;
pub use store::{InstalledLookup, RegistryStore};

/// One tracked GitHub repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPackage {
    pub owner: String,
    pub repo: String,
    pub kind: PackageKind,

    /// Whether downloads need a credential
    #[serde(default)]
    pub private: bool,

    /// Plugin file (`slug/file.php`) or theme stylesheet folder; set only by a
    /// confirmed install
    #[serde(default)]
    pub installed_path: Option<String>,

    /// Declared release version; empty until headers were parsed once
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub requires_host: String,
    #[serde(default)]
    pub tested_host: String,
    #[serde(default)]
    pub requires_runtime: String,

    /// Last resolved archive URL
    #[serde(default)]
    pub download_url: String,

    /// Display name as declared by the package (or the repo name)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub owner_avatar_url: Option<String>,

    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl TrackedPackage {
    /// New, not yet checked record for `owner/repo`
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, kind: PackageKind) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        Self {
            name: repo.clone(),
            owner,
            repo,
            kind,
            private: false,
            installed_path: None,
            version: String::new(),
            requires_host: String::new(),
            tested_host: String::new(),
            requires_runtime: String::new(),
            download_url: String::new(),
            author: String::new(),
            owner_avatar_url: None,
            added_at: Utc::now(),
            last_checked: None,
            last_updated: None,
        }
    }

    /// Registry key: lowercased `owner/repo`
    pub fn key(&self) -> String {
        self.repo_ref().key()
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.repo)
    }

    pub fn is_installed(&self) -> bool {
        self.installed_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Folder the package occupies on disk, derived from `installed_path`
    pub fn installed_folder(&self) -> Option<&str> {
        let path = self.installed_path.as_deref().filter(|p| !p.is_empty())?;
        path.split('/').next()
    }

    /// True when never checked, or last checked at least `window` before `now`
    pub fn is_stale(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        match self.last_checked {
            Some(checked) => now - checked >= window,
            None => true,
        }
    }
}

/// Storage behind the registry.
///
/// The host may substitute its own backend (options table, JSON file, ...);
/// [`SqliteRegistry`] is the default.
pub trait RegistryBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<TrackedPackage>, RegistryError>;

    /// Insert or replace the record stored under `record.key()`.
    fn store(&self, record: &TrackedPackage) -> Result<(), RegistryError>;

    /// Returns whether a record existed.
    fn delete(&self, key: &str) -> Result<bool, RegistryError>;

    /// Every record, ordered by key
    fn list(&self) -> Result<Vec<TrackedPackage>, RegistryError>;
}
