//! Folder naming and placement
//!
//! The extracted `{owner}-{repo}-{sha}` folder must be renamed to the
//! package's canonical slug before it is moved into place; otherwise an
//! update would land next to the tracked copy instead of replacing it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

use regex::Regex;

use crate::error::InstallError;

static ZIPBALL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/repos/[^/]+/([^/]+)/zipball").expect("static regex"));

/// Prefix of per-install staging folders created inside a destination dir
pub const STAGING_PREFIX: &str = ".repopress-";

const BACKUP_MARKER: &str = ".previous-";

/// Staging folder prefix tagged with this process id
pub fn staging_prefix() -> String {
    format!("{}{}-", STAGING_PREFIX, std::process::id())
}

/// Owner pid embedded in a staging or backup entry name.
///
/// `Some(None)` means the entry is ours to judge but carries no readable pid.
fn leftover_owner(name: &str) -> Option<Option<u32>> {
    if let Some(rest) = name.strip_prefix(STAGING_PREFIX) {
        let pid = rest.split_once('-').map(|(pid, _)| pid).unwrap_or(rest);
        return Some(pid.parse().ok());
    }
    if name.starts_with('.') {
        let (_, pid) = name.rsplit_once(BACKUP_MARKER)?;
        return Some(pid.parse().ok());
    }
    None
}

/// Remove staging and backup folders left in `dest_dir` by an install that
/// never finished.
///
/// Entries tagged with this process id belong to installs still running
/// and are kept. Entries from another process are removed once older than
/// `stale_after`; entries without a readable pid are always removed.
/// Returns the number of entries removed.
pub fn sweep_stale_entries(dest_dir: &Path, stale_after: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(dest_dir) else {
        return 0;
    };
    let own_pid = std::process::id();
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(owner) = leftover_owner(&name) else {
            continue;
        };
        let stale = match owner {
            Some(pid) if pid == own_pid => false,
            Some(_) => entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age >= stale_after),
            None => true,
        };
        if !stale {
            continue;
        }

        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => {
                log::warn!("Removed leftover install folder {}", path.display());
                removed += 1;
            }
            Err(e) => log::warn!("Failed to remove leftover {}: {}", path.display(), e),
        }
    }
    removed
}

/// Lowercase, dash-separated folder name
pub fn sanitize_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => slug.push(c),
            'A'..='Z' => slug.push(c.to_ascii_lowercase()),
            '-' | '.' | ' ' | '\t' => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            }
            _ => {}
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Canonical slug for a `/repos/{owner}/{repo}/zipball[/ref]` URL
pub fn slug_from_download_url(download_url: &str) -> Option<String> {
    let path = reqwest::Url::parse(download_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| download_url.to_string());
    let caps = ZIPBALL_PATH.captures(&path)?;
    let slug = sanitize_slug(&caps[1]);
    (!slug.is_empty()).then_some(slug)
}

/// Rename `source` to `target` within its parent folder.
///
/// A no-op when the names already match. Failure aborts the install.
pub fn normalize_source_folder(source: &Path, target: &str) -> Result<PathBuf, InstallError> {
    let from = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if from == target {
        return Ok(source.to_path_buf());
    }

    let rename_error = |reason: String| InstallError::Rename {
        from: from.clone(),
        to: target.to_string(),
        reason,
    };

    let parent = source
        .parent()
        .ok_or_else(|| rename_error("extracted folder has no parent".to_string()))?;
    let renamed = parent.join(target);
    if renamed.exists() {
        return Err(rename_error("destination already exists".to_string()));
    }
    std::fs::rename(source, &renamed).map_err(|e| rename_error(e.to_string()))?;

    log::debug!("Renamed extracted folder {} -> {}", from, target);
    Ok(renamed)
}

/// Move `staged` to `dest_dir/folder`, replacing an existing copy.
///
/// The old copy is moved aside first and deleted only after the new one is
/// in place; if the swap fails it is restored.
pub fn swap_into_place(staged: &Path, dest_dir: &Path, folder: &str) -> Result<PathBuf, InstallError> {
    let host_error = |e: std::io::Error| InstallError::HostInstall(e.to_string());

    std::fs::create_dir_all(dest_dir).map_err(host_error)?;
    let target = dest_dir.join(folder);

    if !target.exists() {
        std::fs::rename(staged, &target).map_err(host_error)?;
        return Ok(target);
    }

    let backup = dest_dir.join(format!(".{}{}{}", folder, BACKUP_MARKER, std::process::id()));
    if backup.exists() {
        std::fs::remove_dir_all(&backup).map_err(host_error)?;
    }
    std::fs::rename(&target, &backup).map_err(host_error)?;

    if let Err(e) = std::fs::rename(staged, &target) {
        if let Err(restore) = std::fs::rename(&backup, &target) {
            log::warn!(
                "Failed to restore {} from {}: {}",
                target.display(),
                backup.display(),
                restore
            );
        }
        return Err(host_error(e));
    }

    if let Err(e) = std::fs::remove_dir_all(&backup) {
        log::warn!("Failed to remove previous copy {}: {}", backup.display(), e);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sweep_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::create_dir_all(dir.join(".repopress-dead01/acme-widget-abc1234")).unwrap();
        std::fs::create_dir_all(dir.join(".repopress-4000000000-x1y2")).unwrap();
        std::fs::create_dir_all(dir.join(".widget.previous-4000000000")).unwrap();
        std::fs::create_dir_all(dir.join(format!("{}live", staging_prefix()))).unwrap();
        std::fs::create_dir_all(dir.join(format!(".gadget.previous-{}", std::process::id()))).unwrap();
        std::fs::create_dir_all(dir.join("widget")).unwrap();
        std::fs::create_dir_all(dir.join(".git")).unwrap();

        // A foreign pid younger than the threshold may still be running
        assert_eq!(sweep_stale_entries(dir, Duration::from_secs(3600)), 1);
        assert!(!dir.join(".repopress-dead01").exists());
        assert!(dir.join(".repopress-4000000000-x1y2").exists());

        assert_eq!(sweep_stale_entries(dir, Duration::ZERO), 2);

        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let mut expected = vec![
            ".git".to_string(),
            format!(".gadget.previous-{}", std::process::id()),
            format!("{}live", staging_prefix()),
            "widget".to_string(),
        ];
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_sweep_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(sweep_stale_entries(&tmp.path().join("nope"), Duration::ZERO), 0);
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("Widget"), "widget");
        assert_eq!(sanitize_slug("My.Cool Plugin"), "my-cool-plugin");
        assert_eq!(sanitize_slug("--a--b--"), "a-b");
        assert_eq!(sanitize_slug("wp_seo"), "wp_seo");
        assert_eq!(sanitize_slug("ünïcode!"), "ncode");
    }

    #[test]
    fn test_slug_from_download_url() {
        assert_eq!(
            slug_from_download_url("https://api.github.com/repos/acme/Widget/zipball").as_deref(),
            Some("widget")
        );
        assert_eq!(
            slug_from_download_url("https://api.github.com/repos/acme/widget/zipball/v1.2.0")
                .as_deref(),
            Some("widget")
        );
        assert_eq!(
            slug_from_download_url("http://127.0.0.1:4000/repos/acme/dusk-theme/zipball?x=1")
                .as_deref(),
            Some("dusk-theme")
        );
        assert!(slug_from_download_url("https://example.com/widget.zip").is_none());
    }

    #[test]
    fn test_normalize_renames_github_folder() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("acme-widget-abc1234");
        std::fs::create_dir(&source).unwrap();

        let renamed = normalize_source_folder(&source, "widget").unwrap();
        assert_eq!(renamed, dir.path().join("widget"));
        assert!(renamed.is_dir());
        assert!(!source.exists());
    }

    #[test]
    fn test_normalize_same_name_is_noop() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("widget");
        std::fs::create_dir(&source).unwrap();
        assert_eq!(normalize_source_folder(&source, "widget").unwrap(), source);
    }

    #[test]
    fn test_normalize_failure_names_both_folders() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("acme-widget-abc1234");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(dir.path().join("widget")).unwrap();

        let err = normalize_source_folder(&source, "widget").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("acme-widget-abc1234"));
        assert!(msg.contains("\"widget\""));
    }

    #[test]
    fn test_swap_into_empty_dir() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("staged");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("a.txt"), "new").unwrap();

        let dest = dir.path().join("plugins");
        let installed = swap_into_place(&staged, &dest, "widget").unwrap();
        assert_eq!(installed, dest.join("widget"));
        assert_eq!(std::fs::read_to_string(installed.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn test_swap_replaces_existing_copy() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("plugins");
        std::fs::create_dir_all(dest.join("widget")).unwrap();
        std::fs::write(dest.join("widget/old.txt"), "old").unwrap();

        let staged = dir.path().join("staged");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("new.txt"), "new").unwrap();

        swap_into_place(&staged, &dest, "widget").unwrap();
        assert!(dest.join("widget/new.txt").is_file());
        assert!(!dest.join("widget/old.txt").exists());

        let leftovers: Vec<_> = std::fs::read_dir(&dest).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
