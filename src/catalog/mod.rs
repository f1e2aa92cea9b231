//! Host-facing package service
//!
//! [`Catalog`] ties the client, compatibility evaluator, registry and
//! installer together into the operations a host calls: search, detail
//! bundles, changelogs, compatibility verdicts and installs. Derived results
//! (headers, verdicts, changelog HTML) are cached here; raw API responses are
//! cached by wrapping the client in a
//! [`CachedGitHubClient`](crate::cache::CachedGitHubClient).

pub mod changelog;
pub mod details;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::{CacheStore, CacheTtl, cache_key, get_json, set_json};
use crate::client::models::{ChangelogEntry, Repository};
use crate::client::scrape::{extract_primary_language, extract_watchers, og_image_or_avatar};
use crate::client::{GitHubApi, PagedResponse, SearchParams, fetch_package_headers};
use crate::compat::{CompatibilityVerdict, check_headers};
use crate::config::{HostEnvironment, Settings};
use crate::error::{ApiError, ConfigError, Error, InstallError, Result};
use crate::installer::{InstallRequest, InstalledPackage, Installer, TargetFolder};
use crate::metadata::{PackageHeaders, strip_header_lines};
use crate::package::{PackageKind, RepoRef};
use crate::registry::{InstalledLookup, RegistryStore, TrackedPackage};
use crate::sanitize::{AllowListSanitizer, HtmlSanitizer};

pub use changelog::render_changelog;
pub use details::{NO_README, PackageDetails, PluginInfo, display_name, filter_topics};

/// Package discovery, inspection and installation for one host
pub struct Catalog<A: GitHubApi + ?Sized> {
    api: Arc<A>,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    env: HostEnvironment,
    registry: Arc<RegistryStore>,
    installer: Option<Installer>,
    installed: Option<Arc<dyn InstalledLookup>>,
    sanitizer: Arc<dyn HtmlSanitizer>,
}

fn scope(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

impl<A: GitHubApi + ?Sized> Catalog<A> {
    /// Uncached catalog without an installer
    pub fn new(api: Arc<A>, registry: Arc<RegistryStore>, env: HostEnvironment) -> Self {
        Self {
            api,
            cache: None,
            ttl: Settings::default().cache_ttl(),
            env,
            registry,
            installer: None,
            installed: None,
            sanitizer: Arc::new(AllowListSanitizer::new()),
        }
    }

    /// Cache derived results in `cache` for `ttl`
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self
    }

    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Host query for packages installed outside the registry
    pub fn with_installed_lookup(mut self, lookup: Arc<dyn InstalledLookup>) -> Self {
        self.installed = Some(lookup);
        self
    }

    /// Sanitizer for release notes
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn HtmlSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    /// Advisory rate-limit flag, for the host to warn the user
    pub fn is_rate_limited(&self) -> bool {
        self.api.is_rate_limited()
    }

    fn get_cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        get_json(self.cache.as_deref()?, key)
    }

    fn set_cached<T: serde::Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Some(cache) = self.cache.as_deref() {
            set_json(cache, key, value, ttl);
        }
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    pub async fn search(&self, params: &SearchParams) -> Result<PagedResponse<Repository>> {
        log::debug!(
            "Searching \"{}\" page {}",
            params.effective_query(),
            params.page
        );
        self.api.search_repositories(params).await
    }

    /// Search `keywords` among packages of `kind`
    pub async fn search_kind(
        &self,
        kind: PackageKind,
        keywords: &str,
        page: usize,
    ) -> Result<PagedResponse<Repository>> {
        self.search(&SearchParams::for_kind(kind, keywords).page(page))
            .await
    }

    /// Readme headers for plugins, style.css headers for themes
    pub async fn package_headers(
        &self,
        owner: &str,
        repo: &str,
        kind: PackageKind,
    ) -> Result<PackageHeaders> {
        let endpoint = match kind {
            PackageKind::Plugin => "readme_headers",
            PackageKind::Theme => "style_headers",
        };
        let key = cache_key(endpoint, Some(&scope(owner, repo)), &[]);
        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: {} {}/{}", endpoint, owner, repo);
            return Ok(cached);
        }

        let headers = fetch_package_headers(self.api.as_ref(), owner, repo, kind).await?;
        self.set_cached(&key, &headers, self.ttl);
        Ok(headers)
    }

    /// Compatibility of `owner/repo` with this host.
    ///
    /// Never fails: a repository without a readme or style.css gets the
    /// "no valid metadata" verdict, and a transport or API failure becomes an
    /// incompatible verdict naming the error, cached only briefly.
    pub async fn check_compatibility(
        &self,
        owner: &str,
        repo: &str,
        kind: PackageKind,
    ) -> CompatibilityVerdict {
        let key = cache_key(
            "compatibility",
            Some(&scope(owner, repo)),
            &[("kind", kind.as_str())],
        );
        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: compatibility {}/{}", owner, repo);
            return cached;
        }

        let (verdict, ttl) = match self.package_headers(owner, repo, kind).await {
            Ok(headers) => (check_headers(&headers, &self.env, kind), self.ttl),
            Err(e) if e.is_not_found() => (CompatibilityVerdict::no_valid_metadata(kind), self.ttl),
            Err(e) => {
                log::warn!("Compatibility check for {}/{} failed: {}", owner, repo, e);
                (
                    CompatibilityVerdict::incompatible(e.to_string()),
                    CacheTtl::NEGATIVE_VERDICT,
                )
            }
        };
        self.set_cached(&key, &verdict, ttl);
        verdict
    }

    /// Whether the host has `repo` installed, by its own report or the registry's
    pub fn is_installed(&self, repo: &RepoRef, kind: PackageKind) -> bool {
        let reported = self
            .installed
            .as_ref()
            .is_some_and(|lookup| lookup.installed_path(repo, kind).is_some());
        if reported {
            return true;
        }
        match self.registry.get(&repo.key()) {
            Ok(record) => record.is_some_and(|r| r.is_installed()),
            Err(e) => {
                log::warn!("Registry lookup for {} failed: {}", repo, e);
                false
            }
        }
    }

    /// Detail bundle for one repository.
    ///
    /// Only the repository lookup is required; readme, scraped stats and the
    /// branch date fall back to defaults when unavailable.
    pub async fn package_details(
        &self,
        owner: &str,
        repo: &str,
        kind: PackageKind,
    ) -> Result<PackageDetails> {
        let repository = self.api.get_repo(owner, repo).await?;
        let mut details = details::from_repository(&repository, kind);

        match self.api.get_readme_html(owner, repo).await {
            Ok(html) => details.readme_html = strip_header_lines(&html),
            Err(e) => log::debug!("No readme for {}/{}: {}", owner, repo, e),
        }

        let page_html = match self.api.get_repo_page_html(owner, repo).await {
            Ok(html) => Some(html),
            Err(e) => {
                log::debug!("Repository page for {}/{} unavailable: {}", owner, repo, e);
                None
            }
        };
        if details.watchers.is_none() {
            details.watchers = page_html.as_deref().and_then(extract_watchers);
        }
        if details.language.is_none() {
            details.language = page_html.as_deref().and_then(extract_primary_language);
        }
        details.og_image = og_image_or_avatar(page_html.as_deref(), &repository.owner.avatar_url);

        match self
            .api
            .get_branch(owner, repo, &repository.default_branch)
            .await
        {
            Ok(branch) => {
                if let Some(date) = branch.last_commit_date() {
                    details.last_updated = Some(date);
                }
            }
            Err(e) => log::debug!("Branch lookup for {}/{} failed: {}", owner, repo, e),
        }

        details.is_installed = self.is_installed(&RepoRef::new(owner, repo), kind);
        details.compatibility = self.check_compatibility(owner, repo, kind).await;
        details.download_url = self.api.download_url(owner, repo, None);
        Ok(details)
    }

    /// Release history as an HTML fragment. No releases is `NotFound`.
    pub async fn changelog_html(&self, owner: &str, repo: &str) -> Result<String> {
        let key = cache_key("changelog_html", Some(&scope(owner, repo)), &[]);
        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: changelog {}/{}", owner, repo);
            return Ok(cached);
        }

        let releases = self.api.list_releases(owner, repo).await?;
        let entries: Vec<ChangelogEntry> = releases
            .iter()
            .filter(|r| !r.draft)
            .map(ChangelogEntry::from)
            .collect();
        if entries.is_empty() {
            return Err(ApiError::NotFound(format!("Changelog for \"{}/{}\"", owner, repo)).into());
        }

        let html = render_changelog(&entries, self.sanitizer.as_ref());
        self.set_cached(&key, &html, CacheTtl::CHANGELOG);
        Ok(html)
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Start tracking `input` (`owner/repo`)
    pub async fn add_repository(&self, input: &str, kind: PackageKind) -> Result<TrackedPackage> {
        self.registry
            .add_repository(self.api.as_ref(), input, kind, self.installed.as_deref())
            .await
    }

    pub async fn remove_repository(&self, key: &str) -> Result<()> {
        self.registry.remove(key).await
    }

    pub fn tracked(&self, kind: Option<PackageKind>) -> Result<Vec<TrackedPackage>> {
        self.registry.list(kind)
    }

    /// "View details" bundle for the tracked plugin installed in `slug`.
    ///
    /// `None` when no tracked plugin occupies that folder, so the host can
    /// fall back to its own sources.
    pub async fn plugin_info(&self, slug: &str) -> Result<Option<PluginInfo>> {
        let tracked = self
            .registry
            .list(Some(PackageKind::Plugin))?
            .into_iter()
            .find(|p| p.installed_folder() == Some(slug));
        let Some(tracked) = tracked else {
            return Ok(None);
        };

        let details = self
            .package_details(&tracked.owner, &tracked.repo, PackageKind::Plugin)
            .await?;
        let changelog_html = match self.changelog_html(&tracked.owner, &tracked.repo).await {
            Ok(html) => Some(html),
            Err(e) => {
                log::debug!("No changelog for {}: {}", tracked.key(), e);
                None
            }
        };
        let contributors = self
            .api
            .list_contributors(&tracked.owner, &tracked.repo)
            .await
            .unwrap_or_default();

        Ok(Some(PluginInfo {
            details,
            tracked,
            changelog_html,
            contributors,
        }))
    }

    // ========================================================================
    // Install
    // ========================================================================

    /// Install or update `owner/repo` and register it for update checks.
    ///
    /// Refuses incompatible packages with the verdict's reason. A package
    /// that is already tracked and installed keeps its folder. `credential`
    /// defaults to the client's token; a private repository without one fails
    /// with [`ApiError::MissingToken`] before anything is downloaded.
    pub async fn install_package(
        &self,
        owner: &str,
        repo: &str,
        kind: PackageKind,
        credential: Option<String>,
    ) -> Result<InstalledPackage> {
        let installer = self
            .installer
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("no installer configured".to_string()))?;

        let verdict = self.check_compatibility(owner, repo, kind).await;
        if !verdict.is_compatible {
            return Err(Error::Incompatible(verdict.reason));
        }

        let repo_ref = RepoRef::new(owner, repo);
        let key = repo_ref.key();
        let existing = self.registry.get(&key)?;
        let private = match &existing {
            Some(record) => record.private,
            None => self.api.get_repo(owner, repo).await?.private,
        };
        let credential = credential
            .filter(|c| !c.is_empty())
            .or_else(|| self.api.credential());
        if private && credential.is_none() {
            return Err(ApiError::MissingToken.into());
        }

        let target = match existing.as_ref().and_then(|r| r.installed_folder()) {
            Some(folder) => TargetFolder::Existing(folder.to_string()),
            None => TargetFolder::Slug,
        };

        let download_url = self.api.download_url(owner, repo, None);
        let request = InstallRequest::new(download_url.clone(), kind)
            .credential(credential)
            .target(target);
        let installed = installer.install(&request).await?;

        let headers = &verdict.headers;
        let header = |name: &str| headers.get(name).cloned().unwrap_or_default();
        let identity = installed.identity.clone();
        let now = Utc::now();
        self.registry
            .upsert(
                &key,
                || {
                    let mut record = TrackedPackage::new(owner.to_lowercase(), repo.to_lowercase(), kind);
                    record.private = private;
                    record
                },
                |record| {
                    record.kind = kind;
                    record.installed_path = Some(identity.installed_path);
                    if !identity.name.is_empty() {
                        record.name = identity.name;
                    }
                    if !identity.author.is_empty() {
                        record.author = identity.author;
                    }
                    record.version = if identity.version.is_empty() {
                        header("version")
                    } else {
                        identity.version
                    };
                    record.requires_host = header("requires at least");
                    record.tested_host = header("tested up to");
                    record.requires_runtime = header("requires php");
                    record.download_url = download_url;
                    record.last_checked = Some(now);
                    record.last_updated = Some(now);
                },
            )
            .await
            .map_err(|e| InstallError::Register(e.to_string()))?;

        log::info!("Installed {} {} into {}", kind, key, installed.folder);
        Ok(installed)
    }
}
