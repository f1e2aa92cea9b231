//! Installed package discovery for hosts that do not track versions

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::installer::{PackageIdentity, read_identity};
use crate::package::PackageKind;

/// Identities of the packages installed under `dir`, keyed by installed path.
///
/// Folders without a valid header are skipped; a missing `dir` is empty.
pub fn scan_installed(dir: &Path, kind: PackageKind) -> std::io::Result<BTreeMap<String, PackageIdentity>> {
    let mut found = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(folder) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if folder.starts_with('.') {
            continue;
        }
        match read_identity(&path, &folder, kind) {
            Ok(identity) => {
                found.insert(identity.installed_path.clone(), identity);
            }
            Err(e) => log::debug!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(found)
}

/// Installed path → version, the shape [`super::pending_updates`] expects
pub fn installed_versions(scan: &BTreeMap<String, PackageIdentity>) -> HashMap<String, String> {
    scan.iter()
        .map(|(path, identity)| (path.clone(), identity.version.clone()))
        .collect()
}
