//! repopress - WordPress plugins and themes straight from GitHub
//!
//! Finds packages by topic, checks them against the running host, installs
//! them into a stable folder and keeps them up to date. The host supplies
//! its collaborators (settings, scheduler, install primitive, installed
//! package lookup, HTML sanitizer) through traits; everything else lives
//! here.
//!
//! ```ignore
//! let settings = Settings::load()?.apply_env();
//! let cache: Arc<dyn CacheStore> = Arc::new(CacheStorage::open_at(&settings.resolved_cache_dir()?)?);
//! let api = Arc::new(CachedGitHubClient::new(
//!     GitHubClient::from_settings(&settings)?,
//!     cache.clone(),
//!     settings.cache_ttl(),
//! ));
//! let registry = Arc::new(RegistryStore::new(Arc::new(SqliteRegistry::open_at(&dir)?)));
//! let catalog = Catalog::new(api, registry, HostEnvironment::new("6.5", "8.2"))
//!     .with_cache(cache, settings.cache_ttl())
//!     .with_installer(Installer::from_settings(&settings)?);
//! ```

pub mod cache;
pub mod catalog;
pub mod client;
pub mod compat;
pub mod config;
pub mod error;
pub mod installer;
pub mod metadata;
pub mod package;
pub mod registry;
pub mod sanitize;
pub mod updater;

pub use cache::{CacheStorage, CacheStore, CachedGitHubClient, MemoryCache};
pub use catalog::{Catalog, PackageDetails, PluginInfo};
pub use client::{GitHubApi, GitHubClient, SearchParams};
pub use compat::CompatibilityVerdict;
pub use config::{HostEnvironment, Settings, SettingsStore};
pub use error::{Error, Result};
pub use installer::{InstallRequest, InstalledPackage, Installer};
pub use metadata::PackageHeaders;
pub use package::{PackageKind, RepoRef};
pub use registry::{RegistryStore, SqliteRegistry, TrackedPackage};
pub use updater::{CheckSummary, UpdateChecker, UpdateDescriptor};
