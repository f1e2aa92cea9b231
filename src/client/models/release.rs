//! Release models and their changelog projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub zipball_url: Option<String>,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub prerelease: bool,
}

impl Release {
    /// Tag name without a leading `v`.
    pub fn version(&self) -> String {
        strip_version_prefix(&self.tag_name).to_string()
    }
}

/// One changelog line derived from a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    pub title: String,
    /// Release notes as written upstream (not yet sanitized)
    pub description: String,
    pub date: Option<DateTime<Utc>>,
    pub url: String,
}

impl From<&Release> for ChangelogEntry {
    fn from(release: &Release) -> Self {
        Self {
            version: release.version(),
            title: release.name.clone().unwrap_or_default().trim().to_string(),
            description: release.body.clone().unwrap_or_default(),
            date: release.published_at,
            url: release.html_url.clone(),
        }
    }
}

/// Strip leading `v`/`V` characters from a tag name.
pub fn strip_version_prefix(tag: &str) -> &str {
    tag.trim().trim_start_matches(['v', 'V'])
}
