//! Readme and stylesheet lookup with filename fallbacks

use super::api::ContentApi;
use crate::error::{ApiError, Result};
use crate::metadata::{PackageHeaders, extract_readme_headers, extract_style_headers};
use crate::package::PackageKind;

const README_FILES: &[&str] = &["readme.txt", "README.txt"];
const STYLE_FILES: &[&str] = &["style.css", "STYLE.CSS"];

/// Readme text for header parsing.
///
/// Tries `readme.txt`, then `README.txt`, then the `/readme` endpoint (which
/// finds `README.md` and friends). Only a 404 moves on to the next candidate;
/// any other failure is returned as is.
pub async fn fetch_readme_content<C>(api: &C, owner: &str, repo: &str) -> Result<String>
where
    C: ContentApi + ?Sized,
{
    if let Some(text) = first_existing_file(api, owner, repo, README_FILES).await? {
        return Ok(text);
    }

    log::debug!("No readme.txt in {}/{}, using readme endpoint", owner, repo);
    let file = api.get_readme(owner, repo).await?;
    Ok(file.decode()?)
}

/// Theme `style.css` text, trying `style.css` then `STYLE.CSS`.
pub async fn fetch_style_content<C>(api: &C, owner: &str, repo: &str) -> Result<String>
where
    C: ContentApi + ?Sized,
{
    first_existing_file(api, owner, repo, STYLE_FILES)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("style.css in \"{}/{}\"", owner, repo)).into())
}

/// Headers of a package: `readme.txt` for plugins, `style.css` for themes.
///
/// A missing file is a `NotFound` error; a file without headers yields empty
/// fields.
pub async fn fetch_package_headers<C>(
    api: &C,
    owner: &str,
    repo: &str,
    kind: PackageKind,
) -> Result<PackageHeaders>
where
    C: ContentApi + ?Sized,
{
    Ok(match kind {
        PackageKind::Plugin => extract_readme_headers(&fetch_readme_content(api, owner, repo).await?),
        PackageKind::Theme => extract_style_headers(&fetch_style_content(api, owner, repo).await?),
    })
}

async fn first_existing_file<C>(
    api: &C,
    owner: &str,
    repo: &str,
    candidates: &[&str],
) -> Result<Option<String>>
where
    C: ContentApi + ?Sized,
{
    for path in candidates {
        match api.get_file_content(owner, repo, path).await {
            Ok(file) => return Ok(Some(file.decode()?)),
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockGitHubClient;

    #[tokio::test]
    async fn test_readme_prefers_readme_txt() {
        let mock = MockGitHubClient::new()
            .with_file("acme/widget", "readme.txt", "Stable tag: 1.0\n")
            .with_file("acme/widget", "README.txt", "Stable tag: 2.0\n");

        let text = fetch_readme_content(&mock, "acme", "widget").await.unwrap();
        assert_eq!(text, "Stable tag: 1.0\n");
    }

    #[tokio::test]
    async fn test_readme_falls_back_to_uppercase_then_endpoint() {
        let mock = MockGitHubClient::new().with_file("acme/widget", "README.txt", "upper");
        assert_eq!(
            fetch_readme_content(&mock, "acme", "widget").await.unwrap(),
            "upper"
        );

        let mock = MockGitHubClient::new().with_readme("acme/widget", "# Widget\n");
        assert_eq!(
            fetch_readme_content(&mock, "acme", "widget").await.unwrap(),
            "# Widget\n"
        );
        assert_eq!(mock.call_counts().await.get_file_content, 2);
    }

    #[tokio::test]
    async fn test_readme_stops_on_non_404() {
        let mock = MockGitHubClient::new()
            .with_readme("acme/widget", "never reached")
            .with_error(ApiError::Unauthorized);

        let err = fetch_readme_content(&mock, "acme", "widget")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(mock.call_counts().await.get_readme, 0);
    }

    #[tokio::test]
    async fn test_missing_style_is_not_found() {
        let mock = MockGitHubClient::new();
        let err = fetch_style_content(&mock, "acme", "theme").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_style_uppercase_fallback() {
        let mock = MockGitHubClient::new().with_file("acme/theme", "STYLE.CSS", "Version: 3\n");
        assert_eq!(
            fetch_style_content(&mock, "acme", "theme").await.unwrap(),
            "Version: 3\n"
        );
    }

    #[tokio::test]
    async fn test_package_headers_by_kind() {
        let mock = MockGitHubClient::new()
            .with_file("acme/widget", "readme.txt", "Stable tag: 1.4\nRequires PHP: 8.1\n")
            .with_file("acme/dusk", "style.css", "/*\nTheme Name: Dusk\nVersion: 2.0\n*/");

        let h = fetch_package_headers(&mock, "acme", "widget", PackageKind::Plugin)
            .await
            .unwrap();
        assert_eq!(h.stable_tag, "1.4");
        assert_eq!(h.requires_php, "8.1");

        let h = fetch_package_headers(&mock, "acme", "dusk", PackageKind::Theme)
            .await
            .unwrap();
        assert_eq!(h.version, "2.0");

        let err = fetch_package_headers(&mock, "acme", "widget", PackageKind::Theme)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
