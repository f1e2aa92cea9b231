//! Repository models returned by search and `/repos/{owner}/{repo}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository owner (user or organization)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,

    #[serde(default)]
    pub avatar_url: String,

    #[serde(default)]
    pub html_url: String,
}

/// Repository license summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub key: Option<String>,

    pub name: String,

    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// GitHub repository, as found in search items and repository details.
///
/// Search items omit a few detail-only fields (`subscribers_count`), so
/// everything beyond the identity is optional or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: u64,

    /// Repository name
    pub name: String,

    /// `owner/repo`
    pub full_name: String,

    pub owner: Owner,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default)]
    pub stargazers_count: u64,

    #[serde(default)]
    pub forks_count: u64,

    #[serde(default)]
    pub open_issues_count: u64,

    /// Real watcher count; only present on repository details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers_count: Option<u64>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub archived: bool,

    #[serde(default)]
    pub private: bool,

    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub license: Option<License>,
}

fn default_branch() -> String {
    "main".to_string()
}

/// `/search/repositories` response body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total_count: usize,

    #[serde(default)]
    pub incomplete_results: bool,

    pub items: Vec<Repository>,
}

/// Contributor summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,

    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub avatar_url: String,

    #[serde(default)]
    pub contributions: u64,
}

/// `/repos/{owner}/{repo}/branches/{branch}` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchDetails {
    pub name: String,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
    pub commit: CommitData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitData {
    #[serde(default)]
    pub author: Option<CommitSignature>,

    #[serde(default)]
    pub committer: Option<CommitSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl BranchDetails {
    /// Date of the branch head commit, author date preferred.
    pub fn last_commit_date(&self) -> Option<DateTime<Utc>> {
        let commit = &self.commit.commit;
        commit
            .author
            .as_ref()
            .and_then(|a| a.date)
            .or_else(|| commit.committer.as_ref().and_then(|c| c.date))
    }
}
