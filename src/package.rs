//! Package identity shared by every subsystem
//!
//! A package is a GitHub repository holding either a WordPress plugin or a
//! theme. [`PackageKind`] is threaded through one parameterized pipeline
//! instead of keeping separate plugin and theme code paths.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

static REPO_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+/[A-Za-z0-9_.-]+$").expect("static regex")
});

/// Kind of package a repository holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    Plugin,
    Theme,
}

impl PackageKind {
    /// GitHub topic used to scope searches for this kind.
    pub fn default_topic(&self) -> &'static str {
        match self {
            PackageKind::Plugin => "wordpress-plugin",
            PackageKind::Theme => "wordpress-theme",
        }
    }

    /// Topics too generic to show next to a package of this kind.
    pub fn generic_topics(&self) -> &'static [&'static str] {
        match self {
            PackageKind::Plugin => &[
                "wordpress-plugin",
                "wordpress-plugins",
                "wordpress",
                "plugin",
                "wp-plugin",
                "wp",
            ],
            PackageKind::Theme => &[
                "wordpress-theme",
                "wordpress-themes",
                "wordpress",
                "theme",
                "wp-theme",
                "wp",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Plugin => "plugin",
            PackageKind::Theme => "theme",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plugin" => Ok(PackageKind::Plugin),
            "theme" => Ok(PackageKind::Theme),
            other => Err(format!("unknown package kind: {}", other)),
        }
    }
}

/// Check that `input` is exactly `owner/repo` with GitHub-legal characters.
pub fn validate_repo_format(input: &str) -> bool {
    REPO_FORMAT.is_match(input)
}

/// A GitHub `owner/repo` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse and validate an `owner/repo` string.
    pub fn parse(input: &str) -> std::result::Result<Self, RegistryError> {
        let trimmed = input.trim();
        if !validate_repo_format(trimmed) {
            return Err(RegistryError::InvalidFormat(trimmed.to_string()));
        }
        let (owner, repo) = trimmed
            .split_once('/')
            .ok_or_else(|| RegistryError::InvalidFormat(trimmed.to_string()))?;
        Ok(Self::new(owner, repo))
    }

    /// Case-insensitive registry key (`owner/repo`, lowercased).
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.repo).to_lowercase()
    }

    /// Public GitHub page of the repository.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RepoRef::parse(s)
    }
}
