//! Repository API trait for search and metadata operations

use async_trait::async_trait;

use crate::client::models::{BranchDetails, Contributor, Release, Repository};
use crate::client::pagination::{PagedResponse, SearchParams};
use crate::error::Result;

/// Maximum contributors returned by [`RepoApi::list_contributors`]
pub const MAX_CONTRIBUTORS: usize = 5;

/// Repository search and metadata operations for the GitHub API
#[async_trait]
pub trait RepoApi: Send + Sync {
    // ========================================================================
    // Search
    // ========================================================================

    /// Search repositories, one page at a time
    async fn search_repositories(&self, params: &SearchParams)
    -> Result<PagedResponse<Repository>>;

    // ========================================================================
    // Repository
    // ========================================================================

    /// Repository details
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository>;

    /// Existence/permission probe. Never served from cache.
    async fn probe_repo(&self, owner: &str, repo: &str) -> Result<Repository>;

    /// Branch head details
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<BranchDetails>;

    /// Top contributors, at most [`MAX_CONTRIBUTORS`]
    async fn list_contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>>;

    // ========================================================================
    // Releases
    // ========================================================================

    /// All published releases, newest first
    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>>;

    /// Latest non-prerelease release
    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Release>;
}
