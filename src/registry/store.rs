//! Per-key serialized access to the registry backend

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{RegistryBackend, TrackedPackage};
use crate::client::GitHubApi;
use crate::error::{RegistryError, Result};
use crate::package::{PackageKind, RepoRef};

/// Host query: "is this repository already installed, and where?"
pub trait InstalledLookup: Send + Sync {
    /// Installed path (`slug/file.php` for plugins, stylesheet for themes)
    fn installed_path(&self, repo: &RepoRef, kind: PackageKind) -> Option<String>;
}

/// Registry front end shared by the catalog, installer and update checker.
///
/// Every mutation takes the key's lock, reloads the full record, applies the
/// change and stores the result, so concurrent writers merge instead of
/// overwriting each other's fields.
pub struct RegistryStore {
    backend: Arc<dyn RegistryBackend>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held key lock. Dropping it releases the lock and forgets the key once no
/// other task is holding or waiting on it.
struct KeyGuard<'a> {
    store: &'a RegistryStore,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.store.lock_map();
        let idle = locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.key);
        }
    }
}

impl RegistryStore {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn lock_key(&self, key: &str) -> KeyGuard<'_> {
        let lock = Arc::clone(self.lock_map().entry(key.to_string()).or_default());
        KeyGuard {
            store: self,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<TrackedPackage>> {
        Ok(self.backend.load(&key.to_lowercase())?)
    }

    /// Tracked packages, optionally only one kind
    pub fn list(&self, kind: Option<PackageKind>) -> Result<Vec<TrackedPackage>> {
        let mut records = self.backend.list()?;
        if let Some(kind) = kind {
            records.retain(|p| p.kind == kind);
        }
        Ok(records)
    }

    /// Track `input` (`owner/repo`) after confirming it is reachable.
    ///
    /// The key is lowercased. The `private` flag comes from the API, and an
    /// already installed copy reported by `installed` is linked right away.
    pub async fn add_repository<A: GitHubApi + ?Sized>(
        &self,
        api: &A,
        input: &str,
        kind: PackageKind,
        installed: Option<&dyn InstalledLookup>,
    ) -> Result<TrackedPackage> {
        let repo_ref = RepoRef::parse(input)?;
        let key = repo_ref.key();
        let _guard = self.lock_key(&key).await;

        if self.backend.load(&key)?.is_some() {
            return Err(RegistryError::AlreadyTracked(key).into());
        }

        let details = api.probe_repo(&repo_ref.owner, &repo_ref.repo).await?;

        let mut record = TrackedPackage::new(
            repo_ref.owner.to_lowercase(),
            repo_ref.repo.to_lowercase(),
            kind,
        );
        record.name = details.name.clone();
        record.private = details.private;
        record.owner_avatar_url = Some(details.owner.avatar_url.clone());
        record.installed_path = installed.and_then(|lookup| lookup.installed_path(&repo_ref, kind));

        self.backend.store(&record)?;
        log::info!(
            "Tracking {} {} (private: {})",
            kind,
            key,
            record.private
        );
        Ok(record)
    }

    /// Stop tracking. Nothing on disk is touched.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_lowercase();
        let _guard = self.lock_key(&key).await;
        if !self.backend.delete(&key)? {
            return Err(RegistryError::NotTracked(key).into());
        }
        log::info!("Stopped tracking {}", key);
        Ok(())
    }

    /// Read-modify-write an existing record.
    pub async fn update<F>(&self, key: &str, merge: F) -> Result<TrackedPackage>
    where
        F: FnOnce(&mut TrackedPackage),
    {
        let key = key.to_lowercase();
        let _guard = self.lock_key(&key).await;

        let mut record = self
            .backend
            .load(&key)?
            .ok_or_else(|| RegistryError::NotTracked(key.clone()))?;
        merge(&mut record);
        self.backend.store(&record)?;
        Ok(record)
    }

    /// Like [`update`](Self::update), creating the record from `create` first
    /// when the key is not tracked yet.
    pub async fn upsert<C, F>(&self, key: &str, create: C, merge: F) -> Result<TrackedPackage>
    where
        C: FnOnce() -> TrackedPackage,
        F: FnOnce(&mut TrackedPackage),
    {
        let key = key.to_lowercase();
        let _guard = self.lock_key(&key).await;

        let mut record = match self.backend.load(&key)? {
            Some(existing) => existing,
            None => create(),
        };
        merge(&mut record);
        self.backend.store(&record)?;
        Ok(record)
    }
}
