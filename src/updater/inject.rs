//! Update descriptors for the host's update list

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::compat::is_newer;
use crate::registry::TrackedPackage;

/// "Update available" entry handed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    /// Registry key (`owner/repo`)
    pub id: String,
    /// Installed folder; updates must keep it
    pub slug: String,
    /// Plugin file or theme stylesheet
    pub installed_path: String,
    pub current_version: String,
    pub new_version: String,
    /// Repository page
    pub url: String,
    pub download_url: String,
    pub tested_host: String,
    pub requires_runtime: String,
    pub icon_url: Option<String>,
}

/// Updates for tracked packages whose installed version is older than the
/// tracked one.
///
/// `installed` maps installed path (plugin file or stylesheet) to the version
/// found on disk. Packages without a tracked version, an installed path or an
/// installed version are skipped. Output is sorted by id.
pub fn pending_updates(
    records: &[TrackedPackage],
    installed: &HashMap<String, String>,
) -> Vec<UpdateDescriptor> {
    let mut updates: Vec<UpdateDescriptor> = records
        .iter()
        .filter(|p| !p.version.is_empty())
        .filter_map(|p| {
            let installed_path = p.installed_path.as_deref().filter(|s| !s.is_empty())?;
            let current = installed.get(installed_path)?;
            if !is_newer(&p.version, current) {
                return None;
            }
            Some(UpdateDescriptor {
                id: p.key(),
                slug: p.installed_folder().unwrap_or(installed_path).to_string(),
                installed_path: installed_path.to_string(),
                current_version: current.clone(),
                new_version: p.version.clone(),
                url: p.repo_ref().html_url(),
                download_url: p.download_url.clone(),
                tested_host: p.tested_host.clone(),
                requires_runtime: p.requires_runtime.clone(),
                icon_url: p.owner_avatar_url.clone(),
            })
        })
        .collect();
    updates.sort_by(|a, b| a.id.cmp(&b.id));
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageKind;

    fn tracked(repo: &str, version: &str, path: Option<&str>) -> TrackedPackage {
        let mut p = TrackedPackage::new("acme", repo, PackageKind::Plugin);
        p.version = version.to_string();
        p.installed_path = path.map(str::to_string);
        p.download_url = format!("https://api.github.com/repos/acme/{}/zipball", repo);
        p.tested_host = "6.5".into();
        p
    }

    fn installed(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_emits_update_for_older_install() {
        let records = vec![tracked("widget", "1.2.0", Some("widget/widget.php"))];
        let updates = pending_updates(&records, &installed(&[("widget/widget.php", "1.1.0")]));

        assert_eq!(updates.len(), 1);
        let u = &updates[0];
        assert_eq!(u.id, "acme/widget");
        assert_eq!(u.slug, "widget");
        assert_eq!(u.current_version, "1.1.0");
        assert_eq!(u.new_version, "1.2.0");
        assert_eq!(u.url, "https://github.com/acme/widget");
        assert_eq!(u.tested_host, "6.5");
    }

    #[test]
    fn test_no_update_when_current_or_newer() {
        let records = vec![
            tracked("a", "1.2.0", Some("a/a.php")),
            tracked("b", "1.2", Some("b/b.php")),
        ];
        let updates = pending_updates(
            &records,
            &installed(&[("a/a.php", "1.3.0"), ("b/b.php", "1.2.0")]),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_skips_unknown_or_unversioned() {
        let records = vec![
            tracked("nover", "", Some("nover/nover.php")),
            tracked("notinstalled", "2.0", None),
            tracked("missing", "2.0", Some("missing/missing.php")),
            tracked("garbage", "2.0", Some("garbage/garbage.php")),
        ];
        let updates = pending_updates(
            &records,
            &installed(&[("nover/nover.php", "1.0"), ("garbage/garbage.php", "dev")]),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn test_output_is_stable() {
        let records = vec![
            tracked("zeta", "2.0", Some("zeta/zeta.php")),
            tracked("alpha", "2.0", Some("alpha/alpha.php")),
        ];
        let map = installed(&[("zeta/zeta.php", "1.0"), ("alpha/alpha.php", "1.0")]);

        let first = pending_updates(&records, &map);
        let second = pending_updates(&records, &map);
        assert_eq!(first, second);
        assert_eq!(first[0].id, "acme/alpha");
    }
}
