//! Package detail bundle shown in the host's detail view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::models::{Contributor, Repository};
use crate::compat::CompatibilityVerdict;
use crate::package::PackageKind;
use crate::registry::TrackedPackage;

/// Shown in place of a readme that could not be fetched
pub const NO_README: &str = "No README available.";

/// Everything the host needs to render one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDetails {
    pub kind: PackageKind,
    pub name: String,
    pub display_name: String,
    pub owner: String,
    pub description: String,

    /// Sanitized readme with the redundant header lines removed
    pub readme_html: String,

    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    /// Scraped; `None` when the repository page could not be read
    pub watchers: Option<u64>,
    pub language: Option<String>,
    pub og_image: Option<String>,

    pub owner_avatar_url: String,
    pub author_url: String,
    pub homepage: Option<String>,
    pub html_url: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub topics: Vec<String>,

    pub is_installed: bool,
    pub compatibility: CompatibilityVerdict,
    pub download_url: String,
}

/// Detail bundle for a tracked plugin, for the host's "view details" dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub details: PackageDetails,
    pub tracked: TrackedPackage,
    /// `None` when the repository has no releases
    pub changelog_html: Option<String>,
    pub contributors: Vec<Contributor>,
}

/// Human name for a repository name: `wp-seo-tools` → `WP SEO Tools`.
pub fn display_name(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(display_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_word(word: &str) -> String {
    match word.to_lowercase().as_str() {
        "wp" => "WP".to_string(),
        "wordpress" => "WordPress".to_string(),
        "seo" => "SEO".to_string(),
        _ => {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Topics worth showing, without the generic ones for `kind`.
pub fn filter_topics(topics: &[String], kind: PackageKind) -> Vec<String> {
    let generic = kind.generic_topics();
    topics
        .iter()
        .filter(|topic| !generic.iter().any(|g| g.eq_ignore_ascii_case(topic)))
        .cloned()
        .collect()
}

/// Fields that come straight from the repository record
pub(crate) fn from_repository(repo: &Repository, kind: PackageKind) -> PackageDetails {
    PackageDetails {
        kind,
        name: repo.name.clone(),
        display_name: display_name(&repo.name),
        owner: repo.owner.login.clone(),
        description: repo.description.clone().unwrap_or_default(),
        readme_html: NO_README.to_string(),
        stars: repo.stargazers_count,
        forks: repo.forks_count,
        open_issues: repo.open_issues_count,
        watchers: repo.subscribers_count,
        language: repo.language.clone(),
        og_image: None,
        owner_avatar_url: repo.owner.avatar_url.clone(),
        author_url: repo.owner.html_url.clone(),
        homepage: repo.homepage.clone().filter(|h| !h.is_empty()),
        html_url: repo.html_url.clone(),
        last_updated: repo.pushed_at,
        topics: filter_topics(&repo.topics, kind),
        is_installed: false,
        compatibility: CompatibilityVerdict::compatible(),
        download_url: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::sample_repo;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("wp-seo-tools"), "WP SEO Tools");
        assert_eq!(display_name("better-wordpress-search"), "Better WordPress Search");
        assert_eq!(display_name("widget"), "Widget");
        assert_eq!(display_name("my--plugin"), "My Plugin");
    }

    #[test]
    fn test_filter_topics_is_case_insensitive() {
        let topics = vec![
            "WordPress-Plugin".to_string(),
            "seo".to_string(),
            "wp".to_string(),
            "theme".to_string(),
        ];
        assert_eq!(
            filter_topics(&topics, PackageKind::Plugin),
            vec!["seo".to_string(), "theme".to_string()]
        );
        assert_eq!(
            filter_topics(&topics, PackageKind::Theme),
            vec!["WordPress-Plugin".to_string(), "seo".to_string()]
        );
    }

    #[test]
    fn test_from_repository() {
        let mut repo = sample_repo("acme", "wp-widget");
        repo.homepage = Some(String::new());
        let details = from_repository(&repo, PackageKind::Plugin);

        assert_eq!(details.display_name, "WP Widget");
        assert_eq!(details.owner, "acme");
        assert_eq!(details.topics, vec!["seo".to_string()]);
        assert_eq!(details.readme_html, NO_README);
        assert!(details.homepage.is_none());
        assert!(details.watchers.is_none());
    }
}
