//! Cached wrapper for the GitHub API client
//!
//! Provides transparent caching for API responses. Only successful results
//! are stored; errors always go back to the caller uncached.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, CacheTtl, cache_key, get_json, set_json, token_fingerprint};
use crate::client::models::{BranchDetails, ContentFile, Contributor, Release, Repository};
use crate::client::{ContentApi, GitHubApi, PagedResponse, RepoApi, SearchParams};
use crate::error::Result;

/// Cached wrapper for any GitHubApi implementation.
///
/// `ttl` is the user's cache-duration preference; release data uses the
/// fixed [`CacheTtl`] values instead. Existence probes, raw file contents
/// and download URLs are never cached.
pub struct CachedGitHubClient<C: GitHubApi> {
    inner: Arc<C>,
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
}

impl<C: GitHubApi> CachedGitHubClient<C> {
    /// Create a new cached client wrapper.
    ///
    /// # Arguments
    /// * `inner` - The underlying API client to wrap
    /// * `cache` - Backing store shared with the rest of the crate
    /// * `ttl` - Lifetime of cached API responses
    pub fn new(inner: C, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            cache: Some(cache),
            ttl,
        }
    }

    /// Wrap without caching (every call goes upstream)
    pub fn uncached(inner: C) -> Self {
        Self {
            inner: Arc::new(inner),
            cache: None,
            ttl: Duration::ZERO,
        }
    }

    /// Get the inner client (for operations not part of the trait)
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Try to get cached data
    fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        get_json(self.cache.as_deref()?, key)
    }

    /// Store data in cache
    fn set_cached<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        if let Some(cache) = self.cache.as_deref() {
            set_json(cache, key, data, ttl);
        }
    }
}

fn scope(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

#[async_trait]
impl<C: GitHubApi + 'static> RepoApi for CachedGitHubClient<C> {
    async fn search_repositories(
        &self,
        params: &SearchParams,
    ) -> Result<PagedResponse<Repository>> {
        // Token changes both rate limits and visibility of results
        let token = token_fingerprint(self.inner.credential().as_deref());
        let query = params.effective_query();
        let page = params.page.to_string();
        let per_page = params.per_page.to_string();
        let key = cache_key(
            "search",
            None,
            &[
                ("q", query.as_str()),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
                ("sort", params.sort.as_str()),
                ("order", params.order.as_str()),
                ("token", token.as_str()),
            ],
        );

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: search_repositories");
            return Ok(cached);
        }

        let result = self.inner.search_repositories(params).await?;
        self.set_cached(&key, &result, self.ttl);
        Ok(result)
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let key = cache_key("repo_details", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: get_repo");
            return Ok(cached);
        }

        let result = self.inner.get_repo(owner, repo).await?;
        self.set_cached(&key, &result, self.ttl);
        Ok(result)
    }

    /// Probe - NEVER cached (answers "can I reach it right now")
    async fn probe_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.inner.probe_repo(owner, repo).await
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<BranchDetails> {
        let key = cache_key(
            "branch_details",
            Some(&scope(owner, repo)),
            &[("branch", branch)],
        );

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: get_branch");
            return Ok(cached);
        }

        let result = self.inner.get_branch(owner, repo, branch).await?;
        self.set_cached(&key, &result, self.ttl);
        Ok(result)
    }

    async fn list_contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        let key = cache_key("contributors", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: list_contributors");
            return Ok(cached);
        }

        let result = self.inner.list_contributors(owner, repo).await?;
        self.set_cached(&key, &result, self.ttl);
        Ok(result)
    }

    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        let key = cache_key("releases", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: list_releases");
            return Ok(cached);
        }

        let result = self.inner.list_releases(owner, repo).await?;
        self.set_cached(&key, &result, CacheTtl::CHANGELOG);
        Ok(result)
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let key = cache_key("latest_release", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: get_latest_release");
            return Ok(cached);
        }

        let result = self.inner.get_latest_release(owner, repo).await?;
        self.set_cached(&key, &result, CacheTtl::CHANGELOG);
        Ok(result)
    }
}

#[async_trait]
impl<C: GitHubApi + 'static> ContentApi for CachedGitHubClient<C> {
    async fn get_readme_html(&self, owner: &str, repo: &str) -> Result<String> {
        let key = cache_key("readme_html", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: get_readme_html");
            return Ok(cached);
        }

        let result = self.inner.get_readme_html(owner, repo).await?;
        self.set_cached(&key, &result, self.ttl);
        Ok(result)
    }

    async fn get_readme(&self, owner: &str, repo: &str) -> Result<ContentFile> {
        self.inner.get_readme(owner, repo).await
    }

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentFile> {
        self.inner.get_file_content(owner, repo, path).await
    }

    async fn get_repo_page_html(&self, owner: &str, repo: &str) -> Result<String> {
        let key = cache_key("repo_html", Some(&scope(owner, repo)), &[]);

        if let Some(cached) = self.get_cached(&key) {
            log::debug!("Cache hit: get_repo_page_html");
            return Ok(cached);
        }

        let result = self.inner.get_repo_page_html(owner, repo).await?;
        self.set_cached(&key, &result, CacheTtl::REPO_HTML);
        Ok(result)
    }
}

impl<C: GitHubApi + 'static> GitHubApi for CachedGitHubClient<C> {
    fn credential(&self) -> Option<String> {
        self.inner.credential()
    }

    fn is_rate_limited(&self) -> bool {
        self.inner.is_rate_limited()
    }

    fn set_rate_limited(&self, limited: bool) {
        self.inner.set_rate_limited(limited);
    }

    fn download_url(&self, owner: &str, repo: &str, git_ref: Option<&str>) -> String {
        self.inner.download_url(owner, repo, git_ref)
    }
}
