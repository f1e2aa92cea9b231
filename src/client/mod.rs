//! GitHub API client
//!
//! [`GitHubClient`] talks to the REST API; [`crate::cache::CachedGitHubClient`]
//! wraps any [`GitHubApi`] with TTL caching. Everything above this layer is
//! written against the traits so tests can substitute a mock.

pub mod api;
pub mod content;
pub mod github;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod pagination;
pub mod private;
pub mod rate_limit;
pub mod scrape;

pub use api::{ContentApi, MAX_CONTRIBUTORS, RepoApi};
pub use content::{fetch_package_headers, fetch_readme_content, fetch_style_content};
pub use github::GitHubClient;
#[cfg(test)]
pub use mock::MockGitHubClient;
pub use pagination::{DEFAULT_PAGE_SIZE, PagedResponse, SearchParams, SearchSort, SortOrder};
pub use private::{AccessCheck, PrivateRepoDetails, get_private_repo_details, verify_private_repo_access};
pub use rate_limit::RateLimitState;

/// GitHub API client trait.
///
/// Combines [`RepoApi`] and [`ContentApi`] with the per-instance state the
/// rest of the crate needs: the credential and the advisory rate-limit flag.
pub trait GitHubApi: RepoApi + ContentApi {
    /// Configured access token, if any
    fn credential(&self) -> Option<String>;

    /// Whether an access token is configured
    fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// Advisory rate-limit flag
    fn is_rate_limited(&self) -> bool;

    /// Raise or clear the rate-limit flag
    fn set_rate_limited(&self, limited: bool);

    /// Zipball URL of the default branch, or of `git_ref`
    fn download_url(&self, owner: &str, repo: &str, git_ref: Option<&str>) -> String;
}
