//! GitHub REST API client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::api::{ContentApi, MAX_CONTRIBUTORS, RepoApi};
use super::models::{
    BranchDetails, ContentFile, Contributor, Release, Repository, SearchResponse,
};
use super::pagination::{PagedResponse, SearchParams};
use super::rate_limit::{RateLimitState, remaining_from_headers};
use super::GitHubApi;
use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_WEB_BASE_URL, Settings};
use crate::error::{ApiError, Result};
use crate::sanitize::{AllowListSanitizer, HtmlSanitizer};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("repopress/", env!("CARGO_PKG_VERSION"));

/// Timeout for API calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for best-effort page scraping
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_ACCEPT: &str = "application/vnd.github+json";
const HTML_ACCEPT: &str = "application/vnd.github.v3.html";

/// GitHub API client
pub struct GitHubClient {
    http: HttpClient,
    base_url: String,
    web_base_url: String,
    token: Option<String>,
    rate_limit: Arc<RateLimitState>,
    sanitizer: Arc<dyn HtmlSanitizer>,
}

impl GitHubClient {
    /// Create a new GitHub API client
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            web_base_url: DEFAULT_WEB_BASE_URL.to_string(),
            token: token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            rate_limit: Arc::new(RateLimitState::new()),
            sanitizer: Arc::new(AllowListSanitizer::new()),
        })
    }

    /// Create a client from settings (token and base URLs)
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.token().map(str::to_string))?
            .with_base_url(&settings.api_base_url)
            .with_web_base_url(&settings.web_base_url))
    }

    /// Point the client at another API host (GitHub Enterprise, tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Point page scraping at another web host
    pub fn with_web_base_url(mut self, web_base_url: &str) -> Self {
        self.web_base_url = web_base_url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the readme HTML sanitizer
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn HtmlSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Shared handle to this client's rate-limit flag
    pub fn rate_limit_state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.rate_limit)
    }

    /// GET with auth merged into the given Accept header
    fn get(&self, url: &str, accept: &str) -> RequestBuilder {
        let request = self.http.get(url).header(ACCEPT, accept);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }

    /// Send a request, record rate-limit headers and map failures
    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        let remaining = remaining_from_headers(response.headers());

        if status.is_success() {
            self.rate_limit.observe(remaining);
            return Ok(response);
        }

        if remaining == Some(0) {
            self.rate_limit.set_rate_limited(true);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, resource, &body);
        if matches!(err, ApiError::RateLimited { .. }) {
            self.rate_limit.set_rate_limited(true);
        }
        log::debug!("GitHub request for {} failed: {}", resource, status);
        Err(err.into())
    }

    /// GET an API path and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send(self.get(&url, JSON_ACCEPT).query(query), resource).await?;

        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {}: {}", resource, e)).into()
        })
    }
}

fn repo_path(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}", owner, repo)
}

fn repo_resource(owner: &str, repo: &str) -> String {
    format!("Repository \"{}/{}\"", owner, repo)
}

#[async_trait]
impl RepoApi for GitHubClient {
    async fn search_repositories(
        &self,
        params: &SearchParams,
    ) -> Result<PagedResponse<Repository>> {
        let response: SearchResponse = self
            .get_json(
                "/search/repositories",
                &params.to_query_params(),
                "Search results",
            )
            .await?;

        let mut items = response.items;
        items.truncate(params.per_page);
        Ok(PagedResponse::new(
            items,
            response.total_count,
            params.page,
            params.per_page,
        ))
    }

    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.get_json(&repo_path(owner, repo), &[], &repo_resource(owner, repo))
            .await
    }

    async fn probe_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.get_repo(owner, repo).await
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<BranchDetails> {
        let path = format!("{}/branches/{}", repo_path(owner, repo), branch);
        self.get_json(&path, &[], &format!("Branch \"{}\"", branch))
            .await
    }

    async fn list_contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        let path = format!("{}/contributors", repo_path(owner, repo));
        let mut contributors: Vec<Contributor> = self
            .get_json(
                &path,
                &[("per_page", MAX_CONTRIBUTORS.to_string())],
                &repo_resource(owner, repo),
            )
            .await?;
        contributors.truncate(MAX_CONTRIBUTORS);
        Ok(contributors)
    }

    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        let path = format!("{}/releases", repo_path(owner, repo));
        let releases: Vec<Release> = self
            .get_json(&path, &[], &repo_resource(owner, repo))
            .await?;
        Ok(releases.into_iter().filter(|r| !r.draft).collect())
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let path = format!("{}/releases/latest", repo_path(owner, repo));
        self.get_json(&path, &[], &format!("Latest release of \"{}/{}\"", owner, repo))
            .await
    }
}

#[async_trait]
impl ContentApi for GitHubClient {
    async fn get_readme_html(&self, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}{}/readme", self.base_url, repo_path(owner, repo));
        let resource = format!("Readme of \"{}/{}\"", owner, repo);
        let response = self.send(self.get(&url, HTML_ACCEPT), &resource).await?;

        let html = response.text().await.map_err(ApiError::from)?;
        if html.trim().is_empty() {
            return Err(ApiError::InvalidResponse(format!("{} is empty", resource)).into());
        }
        Ok(self.sanitizer.sanitize(&html))
    }

    async fn get_readme(&self, owner: &str, repo: &str) -> Result<ContentFile> {
        let path = format!("{}/readme", repo_path(owner, repo));
        self.get_json(&path, &[], &format!("Readme of \"{}/{}\"", owner, repo))
            .await
    }

    async fn get_file_content(&self, owner: &str, repo: &str, file: &str) -> Result<ContentFile> {
        let path = format!("{}/contents/{}", repo_path(owner, repo), file);
        self.get_json(&path, &[], &format!("File \"{}\"", file))
            .await
    }

    async fn get_repo_page_html(&self, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}/{}/{}", self.web_base_url, owner, repo);
        let response = self
            .http
            .get(&url)
            .timeout(SCRAPE_TIMEOUT)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status, &repo_resource(owner, repo), "").into());
        }

        let body = response.text().await.map_err(ApiError::from)?;
        if body.trim().is_empty() {
            return Err(ApiError::InvalidResponse("Empty repository page".to_string()).into());
        }
        Ok(body)
    }
}

impl GitHubApi for GitHubClient {
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
        match git_ref.filter(|r| !r.is_empty()) {
            Some(git_ref) => format!("{}{}/zipball/{}", self.base_url, repo_path(owner, repo), git_ref),
            None => format!("{}{}/zipball", self.base_url, repo_path(owner, repo)),
        }
    }
}
