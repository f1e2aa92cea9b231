//! API trait definitions split by responsibility
//!
//! This module organizes the GitHub API surface into focused sub-traits:
//! - [`RepoApi`] - Search, repository, branch, contributor and release data
//! - [`ContentApi`] - Readme, file contents and scraped pages
//!
//! The [`GitHubApi`](super::GitHubApi) super-trait combines both.

mod content;
mod repo;

pub use content::ContentApi;
pub use repo::{MAX_CONTRIBUTORS, RepoApi};
