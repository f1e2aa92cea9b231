//! Package identity read back from the installed files

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InstallError;
use crate::metadata::file_header;
use crate::package::PackageKind;

/// Name, author and version as declared by the package itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub author: String,
    pub version: String,

    /// `folder/file.php` for plugins, the stylesheet folder for themes
    pub installed_path: String,
}

/// Read the identity of the package in `folder`, to be installed as `slug`.
pub fn read_identity(folder: &Path, slug: &str, kind: PackageKind) -> Result<PackageIdentity, InstallError> {
    match kind {
        PackageKind::Plugin => read_plugin_identity(folder, slug),
        PackageKind::Theme => read_theme_identity(folder, slug),
    }
}

fn read_plugin_identity(folder: &Path, slug: &str) -> Result<PackageIdentity, InstallError> {
    let entries = std::fs::read_dir(folder).map_err(|e| InstallError::Verify(e.to_string()))?;

    let mut php_files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "php"))
        .collect();
    php_files.sort();

    for path in php_files {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Some(name) = file_header(&text, "Plugin Name") else {
            continue;
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(PackageIdentity {
            name,
            author: file_header(&text, "Author").unwrap_or_default(),
            version: file_header(&text, "Version").unwrap_or_default(),
            installed_path: format!("{}/{}", slug, file_name),
        });
    }

    Err(InstallError::Verify("No valid plugins were found.".to_string()))
}

fn read_theme_identity(folder: &Path, slug: &str) -> Result<PackageIdentity, InstallError> {
    let text = std::fs::read_to_string(folder.join("style.css")).map_err(|_| {
        InstallError::Verify("The theme is missing the style.css stylesheet.".to_string())
    })?;
    let name = file_header(&text, "Theme Name").ok_or_else(|| {
        InstallError::Verify("The style.css stylesheet does not contain a valid theme header.".to_string())
    })?;

    Ok(PackageIdentity {
        name,
        author: file_header(&text, "Author").unwrap_or_default(),
        version: file_header(&text, "Version").unwrap_or_default(),
        installed_path: slug.to_string(),
    })
}
