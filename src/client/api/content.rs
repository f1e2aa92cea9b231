//! Content API trait for files, rendered readmes and repository pages

use async_trait::async_trait;

use crate::client::models::ContentFile;
use crate::error::Result;

/// File and page content operations
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Rendered readme, passed through the HTML sanitizer
    async fn get_readme_html(&self, owner: &str, repo: &str) -> Result<String>;

    /// Raw readme via the `/readme` endpoint (base64 JSON)
    async fn get_readme(&self, owner: &str, repo: &str) -> Result<ContentFile>;

    /// A file from the default branch via the contents API
    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentFile>;

    /// Public repository web page, for scraping fields the API lacks
    async fn get_repo_page_html(&self, owner: &str, repo: &str) -> Result<String>;
}
