//! Zip verification and extraction
//!
//! GitHub archives hold exactly one top-level folder named
//! `{owner}-{repo}-{sha}`. Anything else is refused before extraction.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::error::InstallError;

fn open(path: &Path) -> Result<ZipArchive<File>, InstallError> {
    let file = File::open(path).map_err(|e| InstallError::Verify(e.to_string()))?;
    ZipArchive::new(file).map_err(|e| InstallError::Verify(e.to_string()))
}

/// Check the archive and return its single top-level folder name.
pub fn verify_archive(path: &Path) -> Result<String, InstallError> {
    let mut archive = open(path)?;
    if archive.is_empty() {
        return Err(InstallError::Verify("the archive is empty".to_string()));
    }

    let mut roots = BTreeSet::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| InstallError::Verify(e.to_string()))?;
        let name = entry
            .enclosed_name()
            .ok_or_else(|| InstallError::Verify(format!("unsafe path \"{}\"", entry.name())))?;

        let mut components = name.components().filter(|c| matches!(c, Component::Normal(_)));
        let Some(Component::Normal(root)) = components.next() else {
            continue;
        };
        if components.next().is_none() && !entry.is_dir() {
            return Err(InstallError::Verify(format!(
                "file \"{}\" outside of a package folder",
                entry.name()
            )));
        }
        roots.insert(root.to_string_lossy().into_owned());
    }

    let mut roots = roots.into_iter();
    match (roots.next(), roots.next()) {
        (Some(root), None) => Ok(root),
        (None, _) => Err(InstallError::Verify("the archive has no folder".to_string())),
        (Some(_), Some(_)) => Err(InstallError::Verify(
            "the archive has more than one top-level folder".to_string(),
        )),
    }
}

/// Extract into `dest` and return the extracted top-level folder.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<PathBuf, InstallError> {
    let root = verify_archive(path)?;
    let mut archive = open(path)?;
    archive
        .extract(dest)
        .map_err(|e| InstallError::Extract(e.to_string()))?;

    let folder = dest.join(&root);
    if !folder.is_dir() {
        return Err(InstallError::Extract(format!(
            "expected folder \"{}\" was not created",
            root
        )));
    }
    Ok(folder)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Write a zip with the given `(path, contents)` entries; paths ending in
    /// `/` become directories.
    pub(crate) fn build_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_verify_single_root() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("a.zip");
        build_zip(
            &zip,
            &[
                ("acme-widget-abc1234/", ""),
                ("acme-widget-abc1234/widget.php", "<?php"),
                ("acme-widget-abc1234/inc/util.php", "<?php"),
            ],
        );
        assert_eq!(verify_archive(&zip).unwrap(), "acme-widget-abc1234");
    }

    #[test]
    fn test_verify_rejects_multiple_roots() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("a.zip");
        build_zip(&zip, &[("one/a.php", "x"), ("two/b.php", "y")]);
        assert!(matches!(verify_archive(&zip), Err(InstallError::Verify(_))));
    }

    #[test]
    fn test_verify_rejects_loose_files() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("a.zip");
        build_zip(&zip, &[("widget.php", "<?php")]);
        assert!(matches!(verify_archive(&zip), Err(InstallError::Verify(_))));
    }

    #[test]
    fn test_verify_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("a.zip");
        build_zip(&zip, &[("../evil.php", "x")]);
        assert!(matches!(verify_archive(&zip), Err(InstallError::Verify(_))));
    }

    #[test]
    fn test_verify_rejects_empty_and_garbage() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.zip");
        build_zip(&empty, &[]);
        assert!(matches!(verify_archive(&empty), Err(InstallError::Verify(_))));

        let garbage = dir.path().join("garbage.zip");
        std::fs::write(&garbage, b"<html>not a zip</html>").unwrap();
        assert!(matches!(verify_archive(&garbage), Err(InstallError::Verify(_))));
    }

    #[test]
    fn test_extract() {
        let dir = TempDir::new().unwrap();
        let zip = dir.path().join("a.zip");
        build_zip(&zip, &[("acme-widget-abc1234/widget.php", "<?php")]);

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let folder = extract_archive(&zip, &out).unwrap();
        assert_eq!(folder, out.join("acme-widget-abc1234"));
        assert!(folder.join("widget.php").is_file());
    }
}
