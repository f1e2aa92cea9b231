//! Package installer
//!
//! Each install walks `Resolved → Downloaded → Verified → Extracted →
//! Renamed → Installed`; registration is done by the caller once the
//! package is on disk. Any failure stops the pipeline with an
//! [`InstallError`] naming the stage. The downloaded archive and the staging
//! folder are temp resources, removed on every exit path.

pub mod archive;
pub mod download;
pub mod folder;
pub mod identity;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{ConfigError, InstallError, InstallStage};
use crate::package::PackageKind;

pub use archive::{extract_archive, verify_archive};
pub use download::{DOWNLOAD_TIMEOUT, Downloader};
pub use folder::{
    normalize_source_folder, sanitize_slug, slug_from_download_url, staging_prefix, sweep_stale_entries,
    swap_into_place,
};
pub use identity::{PackageIdentity, read_identity};

/// Age after which another process's leftover staging folder is removed
pub const STALE_STAGING_AFTER: Duration = Duration::from_secs(60 * 60);

/// Folder a package should occupy after install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFolder {
    /// Derive the slug from the download URL (fresh install)
    Slug,
    /// Keep the folder the host already knows (update)
    Existing(String),
}

/// One install attempt
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub download_url: String,
    pub credential: Option<String>,
    pub kind: PackageKind,
    pub target: TargetFolder,
}

impl InstallRequest {
    pub fn new(download_url: impl Into<String>, kind: PackageKind) -> Self {
        Self {
            download_url: download_url.into(),
            credential: None,
            kind,
            target: TargetFolder::Slug,
        }
    }

    pub fn credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty());
        self
    }

    pub fn target(mut self, target: TargetFolder) -> Self {
        self.target = target;
        self
    }
}

/// Result of a successful install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub kind: PackageKind,
    /// Final folder name inside the plugins/themes directory
    pub folder: String,
    pub path: PathBuf,
    pub identity: PackageIdentity,
}

/// Host primitive that moves a prepared package folder into its final
/// directory.
pub trait HostInstaller: Send + Sync {
    fn install(&self, staged: &Path, dest_dir: &Path, folder: &str) -> Result<PathBuf, InstallError>;
}

/// Default [`HostInstaller`]: staged swap on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryInstaller;

impl HostInstaller for DirectoryInstaller {
    fn install(&self, staged: &Path, dest_dir: &Path, folder: &str) -> Result<PathBuf, InstallError> {
        swap_into_place(staged, dest_dir, folder)
    }
}

/// Downloads, verifies and places packages
pub struct Installer {
    downloader: Downloader,
    plugins_dir: PathBuf,
    themes_dir: PathBuf,
    host: Arc<dyn HostInstaller>,
    stale_after: Duration,
}

impl Installer {
    pub fn new(plugins_dir: impl Into<PathBuf>, themes_dir: impl Into<PathBuf>) -> Result<Self, InstallError> {
        Ok(Self {
            downloader: Downloader::new()?,
            plugins_dir: plugins_dir.into(),
            themes_dir: themes_dir.into(),
            host: Arc::new(DirectoryInstaller),
            stale_after: STALE_STAGING_AFTER,
        })
    }

    /// Build from configured plugin and theme directories
    pub fn from_settings(settings: &Settings) -> crate::error::Result<Self> {
        let plugins_dir = settings
            .plugins_dir
            .clone()
            .ok_or_else(|| ConfigError::Invalid("plugins_dir is not set".to_string()))?;
        let themes_dir = settings
            .themes_dir
            .clone()
            .ok_or_else(|| ConfigError::Invalid("themes_dir is not set".to_string()))?;
        Ok(Self::new(plugins_dir, themes_dir)?)
    }

    /// Replace the host install primitive
    pub fn with_host(mut self, host: Arc<dyn HostInstaller>) -> Self {
        self.host = host;
        self
    }

    /// How old another process's leftovers must be before they are swept
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Directory packages of `kind` are installed into
    pub fn dest_dir(&self, kind: PackageKind) -> &Path {
        match kind {
            PackageKind::Plugin => &self.plugins_dir,
            PackageKind::Theme => &self.themes_dir,
        }
    }

    pub async fn install(&self, request: &InstallRequest) -> Result<InstalledPackage, InstallError> {
        let url = request.download_url.as_str();
        let stage = |stage: InstallStage| log::info!("Install {}: {}", url, stage);

        let target_folder = match &request.target {
            TargetFolder::Existing(folder) => Some(folder.clone()),
            TargetFolder::Slug => slug_from_download_url(url),
        };
        if target_folder.is_none() {
            log::warn!("No slug in {}; keeping the extracted folder name", url);
        }
        stage(InstallStage::Resolved);

        let archive = self
            .downloader
            .download(url, request.credential.as_deref())
            .await?;
        stage(InstallStage::Downloaded);

        let archive_path = archive.path().to_path_buf();
        blocking({
            let archive_path = archive_path.clone();
            move || verify_archive(&archive_path)
        })
        .await?;
        stage(InstallStage::Verified);

        let dest_dir = self.dest_dir(request.kind).to_path_buf();
        std::fs::create_dir_all(&dest_dir).map_err(|e| InstallError::Extract(e.to_string()))?;
        let swept = sweep_stale_entries(&dest_dir, self.stale_after);
        if swept > 0 {
            log::info!("Cleared {} interrupted install(s) in {}", swept, dest_dir.display());
        }
        let staging = tempfile::Builder::new()
            .prefix(&staging_prefix())
            .tempdir_in(&dest_dir)
            .map_err(|e| InstallError::Extract(e.to_string()))?;

        let extracted = blocking({
            let staging_path = staging.path().to_path_buf();
            move || extract_archive(&archive_path, &staging_path)
        })
        .await?;
        drop(archive);
        stage(InstallStage::Extracted);

        let source = match &target_folder {
            Some(folder) => normalize_source_folder(&extracted, folder)?,
            None => extracted,
        };
        let folder = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        stage(InstallStage::Renamed);

        let identity = read_identity(&source, &folder, request.kind)?;

        let path = self.host.install(&source, &dest_dir, &folder)?;
        stage(InstallStage::Installed);

        Ok(InstalledPackage {
            kind: request.kind,
            folder,
            path,
            identity,
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T, InstallError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InstallError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InstallError::Extract(format!("worker failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::archive::tests::build_zip;
    use super::*;
    use tempfile::TempDir;

    const PLUGIN_PHP: &str = "<?php\n/*\n * Plugin Name: Acme Widget\n * Author: Acme\n * Version: 1.0.0\n */\n";

    fn zip_bytes(dir: &Path, entries: &[(&str, &str)]) -> Vec<u8> {
        let path = dir.join("fixture.zip");
        build_zip(&path, entries);
        std::fs::read(path).unwrap()
    }

    async fn serve(server: &mut mockito::Server, path: &str, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/zip")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_install_renames_to_slug() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(tmp.path(), &[("acme-widget-abc1234/widget.php", PLUGIN_PHP)]);
        serve(&mut server, "/repos/acme/widget/zipball", body).await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let request = InstallRequest::new(
            format!("{}/repos/acme/widget/zipball", server.url()),
            PackageKind::Plugin,
        );
        let installed = installer.install(&request).await.unwrap();

        assert_eq!(installed.folder, "widget");
        assert_eq!(installed.path, tmp.path().join("plugins/widget"));
        assert_eq!(installed.identity.installed_path, "widget/widget.php");
        assert_eq!(installed.identity.name, "Acme Widget");
        assert!(!tmp.path().join("plugins/acme-widget-abc1234").exists());
    }

    #[tokio::test]
    async fn test_reinstall_reuses_folder() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let url = format!("{}/repos/acme/widget/zipball", server.url());

        let v1 = zip_bytes(tmp.path(), &[("acme-widget-abc1234/widget.php", PLUGIN_PHP)]);
        let first = serve(&mut server, "/repos/acme/widget/zipball", v1).await;
        installer
            .install(&InstallRequest::new(url.clone(), PackageKind::Plugin))
            .await
            .unwrap();
        first.remove_async().await;

        let v2_php = PLUGIN_PHP.replace("1.0.0", "1.1.0");
        let v2 = zip_bytes(tmp.path(), &[("acme-widget-def5678/widget.php", v2_php.as_str())]);
        serve(&mut server, "/repos/acme/widget/zipball", v2).await;
        let second = installer
            .install(&InstallRequest::new(url, PackageKind::Plugin))
            .await
            .unwrap();

        assert_eq!(second.identity.version, "1.1.0");
        let folders: Vec<String> = std::fs::read_dir(tmp.path().join("plugins"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(folders, vec!["widget".to_string()]);
    }

    #[tokio::test]
    async fn test_update_targets_existing_folder() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(tmp.path(), &[("acme-widget-abc1234/widget.php", PLUGIN_PHP)]);
        serve(&mut server, "/repos/acme/widget/zipball", body).await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let request = InstallRequest::new(
            format!("{}/repos/acme/widget/zipball", server.url()),
            PackageKind::Plugin,
        )
        .target(TargetFolder::Existing("acme-widget".to_string()));

        let installed = installer.install(&request).await.unwrap();
        assert_eq!(installed.folder, "acme-widget");
        assert_eq!(installed.identity.installed_path, "acme-widget/widget.php");
    }

    #[tokio::test]
    async fn test_install_theme() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(
            tmp.path(),
            &[(
                "acme-dusk-abc1234/style.css",
                "/*\nTheme Name: Dusk\nVersion: 2.1.0\n*/",
            )],
        );
        serve(&mut server, "/repos/acme/dusk/zipball", body).await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let installed = installer
            .install(&InstallRequest::new(
                format!("{}/repos/acme/dusk/zipball", server.url()),
                PackageKind::Theme,
            ))
            .await
            .unwrap();
        assert_eq!(installed.path, tmp.path().join("themes/dusk"));
        assert_eq!(installed.identity.installed_path, "dusk");
    }

    #[tokio::test]
    async fn test_download_status_stops_pipeline() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/secret/zipball")
            .with_status(401)
            .create_async()
            .await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let err = installer
            .install(
                &InstallRequest::new(
                    format!("{}/repos/acme/secret/zipball", server.url()),
                    PackageKind::Plugin,
                )
                .credential(Some("ghp_bad".into())),
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage(), InstallStage::Downloaded);
        assert!(!tmp.path().join("plugins").exists());
    }

    #[tokio::test]
    async fn test_invalid_package_leaves_no_folder() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(tmp.path(), &[("acme-widget-abc1234/readme.txt", "no php here")]);
        serve(&mut server, "/repos/acme/widget/zipball", body).await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes")).unwrap();
        let err = installer
            .install(&InstallRequest::new(
                format!("{}/repos/acme/widget/zipball", server.url()),
                PackageKind::Plugin,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), InstallStage::Verified);

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("plugins")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_install_clears_interrupted_staging() {
        let tmp = TempDir::new().unwrap();
        let plugins = tmp.path().join("plugins");
        std::fs::create_dir_all(plugins.join(".repopress-dead01/acme-widget-abc1234")).unwrap();
        std::fs::write(
            plugins.join(".repopress-dead01/acme-widget-abc1234/widget.php"),
            PLUGIN_PHP,
        )
        .unwrap();
        std::fs::create_dir_all(plugins.join(".widget.previous-4000000000")).unwrap();

        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(tmp.path(), &[("acme-widget-abc1234/widget.php", PLUGIN_PHP)]);
        serve(&mut server, "/repos/acme/widget/zipball", body).await;

        let installer = Installer::new(&plugins, tmp.path().join("themes"))
            .unwrap()
            .with_stale_after(Duration::ZERO);
        installer
            .install(&InstallRequest::new(
                format!("{}/repos/acme/widget/zipball", server.url()),
                PackageKind::Plugin,
            ))
            .await
            .unwrap();

        let folders: Vec<String> = std::fs::read_dir(&plugins)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(folders, vec!["widget".to_string()]);
    }

    struct FailingHost;

    impl HostInstaller for FailingHost {
        fn install(&self, _: &Path, _: &Path, _: &str) -> Result<PathBuf, InstallError> {
            Err(InstallError::HostInstall("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_host_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let body = zip_bytes(tmp.path(), &[("acme-widget-abc1234/widget.php", PLUGIN_PHP)]);
        serve(&mut server, "/repos/acme/widget/zipball", body).await;

        let installer = Installer::new(tmp.path().join("plugins"), tmp.path().join("themes"))
            .unwrap()
            .with_host(Arc::new(FailingHost));
        let err = installer
            .install(&InstallRequest::new(
                format!("{}/repos/acme/widget/zipball", server.url()),
                PackageKind::Plugin,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), InstallStage::Installed);
        assert!(err.to_string().contains("disk full"));
    }
}
