//! Mock GitHub API client for testing
//!
//! Provides a mock implementation of the API traits for unit testing
//! without making real API calls.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::GitHubApi;
use super::api::{ContentApi, MAX_CONTRIBUTORS, RepoApi};
use super::models::{
    BranchCommit, BranchDetails, CommitData, CommitSignature, ContentFile, Contributor, Owner,
    Release, Repository,
};
use super::pagination::{PagedResponse, SearchParams};
use super::rate_limit::RateLimitState;
use crate::error::{ApiError, Result};

/// Minimal public repository fixture
pub fn sample_repo(owner: &str, repo: &str) -> Repository {
    Repository {
        id: 1,
        name: repo.to_string(),
        full_name: format!("{}/{}", owner, repo),
        owner: Owner {
            login: owner.to_string(),
            avatar_url: format!("https://avatars.example/{}", owner),
            html_url: format!("https://github.com/{}", owner),
        },
        description: Some(format!("{} description", repo)),
        html_url: format!("https://github.com/{}/{}", owner, repo),
        homepage: None,
        stargazers_count: 10,
        forks_count: 2,
        open_issues_count: 1,
        subscribers_count: None,
        language: None,
        topics: vec!["wordpress-plugin".to_string(), "seo".to_string()],
        archived: false,
        private: false,
        default_branch: "main".to_string(),
        pushed_at: None,
        updated_at: None,
        created_at: None,
        license: None,
    }
}

/// Release fixture
pub fn sample_release(tag: &str) -> Release {
    Release {
        tag_name: tag.to_string(),
        name: Some(format!("Release {}", tag)),
        body: Some("Notes".to_string()),
        published_at: None,
        html_url: format!("https://github.com/acme/widget/releases/tag/{}", tag),
        zipball_url: None,
        draft: false,
        prerelease: false,
    }
}

/// Number of calls per operation
#[derive(Debug, Default, Clone)]
pub struct CallCounts {
    pub search_repositories: usize,
    pub get_repo: usize,
    pub probe_repo: usize,
    pub get_branch: usize,
    pub list_contributors: usize,
    pub list_releases: usize,
    pub get_latest_release: usize,
    pub get_readme_html: usize,
    pub get_readme: usize,
    pub get_file_content: usize,
    pub get_repo_page_html: usize,
}

/// Mock API client for testing.
///
/// Configure expected responses via builder methods, then use in tests.
///
/// # Example
/// ```ignore
/// let mock = MockGitHubClient::new()
///     .with_repo(sample_repo("acme", "widget"))
///     .with_file("acme/widget", "readme.txt", "Stable tag: 1.0\n");
///
/// let repo = mock.get_repo("acme", "widget").await?;
/// ```
pub struct MockGitHubClient {
    token: Option<String>,
    download_base: String,
    repos: HashMap<String, Repository>,
    search_results: Vec<Repository>,
    /// Files keyed by (`owner/repo`, path); mutable so tests can simulate a new upstream version
    files: Mutex<HashMap<(String, String), String>>,
    readmes: HashMap<String, String>,
    readme_html: HashMap<String, String>,
    page_html: HashMap<String, String>,
    releases: HashMap<String, Vec<Release>>,
    contributors: HashMap<String, Vec<Contributor>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    rate_limit: RateLimitState,
}

impl Default for MockGitHubClient {
    fn default() -> Self {
        Self {
            token: None,
            download_base: "https://api.github.com".to_string(),
            repos: HashMap::new(),
            search_results: Vec::new(),
            files: Mutex::new(HashMap::new()),
            readmes: HashMap::new(),
            readme_html: HashMap::new(),
            page_html: HashMap::new(),
            releases: HashMap::new(),
            contributors: HashMap::new(),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
            rate_limit: RateLimitState::new(),
        }
    }
}

fn key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo).to_lowercase()
}

fn encoded(path: &str, text: &str) -> ContentFile {
    ContentFile {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        content: Some(general_purpose::STANDARD.encode(text)),
        encoding: Some("base64".to_string()),
    }
}

impl MockGitHubClient {
    /// Create a new mock client with default empty responses.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Base used by `download_url` (point it at a mockito server)
    pub fn with_download_base(mut self, base: &str) -> Self {
        self.download_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_repo(mut self, repo: Repository) -> Self {
        self.repos.insert(repo.full_name.to_lowercase(), repo);
        self
    }

    pub fn with_search_results(mut self, results: Vec<Repository>) -> Self {
        self.search_results = results;
        self
    }

    /// File served by the contents API
    pub fn with_file(mut self, full_name: &str, path: &str, text: &str) -> Self {
        self.files
            .get_mut()
            .insert((full_name.to_lowercase(), path.to_string()), text.to_string());
        self
    }

    /// Readme served by the `/readme` endpoint
    pub fn with_readme(mut self, full_name: &str, text: &str) -> Self {
        self.readmes
            .insert(full_name.to_lowercase(), text.to_string());
        self
    }

    pub fn with_readme_html(mut self, full_name: &str, html: &str) -> Self {
        self.readme_html
            .insert(full_name.to_lowercase(), html.to_string());
        self
    }

    pub fn with_page_html(mut self, full_name: &str, html: &str) -> Self {
        self.page_html
            .insert(full_name.to_lowercase(), html.to_string());
        self
    }

    pub fn with_releases(mut self, full_name: &str, releases: Vec<Release>) -> Self {
        self.releases.insert(full_name.to_lowercase(), releases);
        self
    }

    pub fn with_contributors(mut self, full_name: &str, contributors: Vec<Contributor>) -> Self {
        self.contributors
            .insert(full_name.to_lowercase(), contributors);
        self
    }

    /// Configure the mock to return an error on the next call.
    pub fn with_error(self, error: ApiError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..self
        }
    }

    /// Replace a file after construction.
    pub async fn set_file(&self, full_name: &str, path: &str, text: &str) {
        self.files
            .lock()
            .await
            .insert((full_name.to_lowercase(), path.to_string()), text.to_string());
    }

    /// Get call counts for verification.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    async fn take_error(&self) -> Result<()> {
        match self.error.lock().await.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn repo_or_404(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.repos.get(&key(owner, repo)).cloned().ok_or_else(|| {
            ApiError::NotFound(format!("Repository \"{}/{}\"", owner, repo)).into()
        })
    }
}

#[async_trait]
impl RepoApi for MockGitHubClient {
    async fn search_repositories(
        &self,
        params: &SearchParams,
    ) -> Result<PagedResponse<Repository>> {
        self.call_count.lock().await.search_repositories += 1;
        self.take_error().await?;

        let start = (params.page - 1) * params.per_page;
        let items = self
            .search_results
            .iter()
            .skip(start)
            .take(params.per_page)
            .cloned()
            .collect();
        Ok(PagedResponse::new(
            items,
            self.search_results.len(),
            params.page,
            params.per_page,
        ))
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.call_count.lock().await.get_repo += 1;
        self.take_error().await?;
        self.repo_or_404(owner, repo)
    }

    async fn probe_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.call_count.lock().await.probe_repo += 1;
        self.take_error().await?;
        self.repo_or_404(owner, repo)
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<BranchDetails> {
        self.call_count.lock().await.get_branch += 1;
        self.take_error().await?;
        let details = self.repo_or_404(owner, repo)?;
        Ok(BranchDetails {
            name: branch.to_string(),
            commit: BranchCommit {
                sha: "abc1234".to_string(),
                commit: CommitData {
                    author: Some(CommitSignature {
                        name: Some(details.owner.login),
                        date: details.pushed_at,
                    }),
                    committer: None,
                },
            },
        })
    }

    async fn list_contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        self.call_count.lock().await.list_contributors += 1;
        self.take_error().await?;
        let mut contributors = self
            .contributors
            .get(&key(owner, repo))
            .cloned()
            .unwrap_or_default();
        contributors.truncate(MAX_CONTRIBUTORS);
        Ok(contributors)
    }

    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        self.call_count.lock().await.list_releases += 1;
        self.take_error().await?;
        Ok(self
            .releases
            .get(&key(owner, repo))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        self.call_count.lock().await.get_latest_release += 1;
        self.take_error().await?;
        self.releases
            .get(&key(owner, repo))
            .and_then(|r| r.iter().find(|r| !r.prerelease && !r.draft).cloned())
            .ok_or_else(|| ApiError::NotFound(format!("Latest release of \"{}/{}\"", owner, repo)).into())
    }
}

#[async_trait]
impl ContentApi for MockGitHubClient {
    async fn get_readme_html(&self, owner: &str, repo: &str) -> Result<String> {
        self.call_count.lock().await.get_readme_html += 1;
        self.take_error().await?;
        self.readme_html
            .get(&key(owner, repo))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Readme of \"{}/{}\"", owner, repo)).into())
    }

    async fn get_readme(&self, owner: &str, repo: &str) -> Result<ContentFile> {
        self.call_count.lock().await.get_readme += 1;
        self.take_error().await?;
        self.readmes
            .get(&key(owner, repo))
            .map(|text| encoded("README.md", text))
            .ok_or_else(|| ApiError::NotFound(format!("Readme of \"{}/{}\"", owner, repo)).into())
    }

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentFile> {
        self.call_count.lock().await.get_file_content += 1;
        self.take_error().await?;
        self.files
            .lock()
            .await
            .get(&(key(owner, repo), path.to_string()))
            .map(|text| encoded(path, text))
            .ok_or_else(|| ApiError::NotFound(format!("File \"{}\"", path)).into())
    }

    async fn get_repo_page_html(&self, owner: &str, repo: &str) -> Result<String> {
        self.call_count.lock().await.get_repo_page_html += 1;
        self.take_error().await?;
        self.page_html
            .get(&key(owner, repo))
            .cloned()
            .ok_or_else(|| ApiError::Network("Unable to fetch repository page".to_string()).into())
    }
}

impl GitHubApi for MockGitHubClient {
    fn credential(&self) -> Option<String> {
        self.token.clone()
    }

    fn is_rate_limited(&self) -> bool {
        self.rate_limit.is_rate_limited()
    }

    fn set_rate_limited(&self, limited: bool) {
        self.rate_limit.set_rate_limited(limited);
    }

    fn download_url(&self, owner: &str, repo: &str, git_ref: Option<&str>) -> String {
        match git_ref {
            Some(git_ref) => format!(
                "{}/repos/{}/{}/zipball/{}",
                self.download_base, owner, repo, git_ref
            ),
            None => format!("{}/repos/{}/{}/zipball", self.download_base, owner, repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_search_pages() {
        let results = (0..15)
            .map(|i| sample_repo("acme", &format!("p{}", i)))
            .collect();
        let mock = MockGitHubClient::new().with_search_results(results);

        let page = mock
            .search_repositories(&SearchParams::new("x").page(2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_count, 15);
        assert_eq!(mock.call_counts().await.search_repositories, 1);
    }

    #[tokio::test]
    async fn test_mock_error_consumed_once() {
        let mock = MockGitHubClient::new()
            .with_repo(sample_repo("acme", "widget"))
            .with_error(ApiError::Network("down".into()));

        assert!(mock.get_repo("acme", "widget").await.is_err());
        assert!(mock.get_repo("acme", "widget").await.is_ok());
        assert_eq!(mock.call_counts().await.get_repo, 2);
    }

    #[tokio::test]
    async fn test_mock_file_round_trip() {
        let mock = MockGitHubClient::new().with_file("Acme/Widget", "readme.txt", "hello");
        let file = mock
            .get_file_content("acme", "widget", "readme.txt")
            .await
            .unwrap();
        assert_eq!(file.decode().unwrap(), "hello");

        mock.set_file("acme/widget", "readme.txt", "changed").await;
        let file = mock
            .get_file_content("acme", "widget", "readme.txt")
            .await
            .unwrap();
        assert_eq!(file.decode().unwrap(), "changed");
    }
}
