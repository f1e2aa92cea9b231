//! Archive download
//!
//! Generic download helpers never send credentials, so archives of private
//! repositories are fetched here with an explicit `Authorization` header.
//! The archive lands in a [`NamedTempFile`], which is deleted when dropped on
//! every exit path.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, StatusCode};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::client::github::USER_AGENT;
use crate::error::InstallError;

/// Archives can be large; allow far more than an API call
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const ARCHIVE_ACCEPT: &str = "application/vnd.github+json";

/// HTTP downloader for package archives
#[derive(Clone)]
pub struct Downloader {
    http: HttpClient,
}

impl Downloader {
    pub fn new() -> Result<Self, InstallError> {
        let http = HttpClient::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| InstallError::Download(e.to_string()))?;
        Ok(Self { http })
    }

    /// Download `url` into a temp file, authenticating when a credential is given.
    pub async fn download(
        &self,
        url: &str,
        credential: Option<&str>,
    ) -> Result<NamedTempFile, InstallError> {
        let mut request = self.http.get(url).header(ACCEPT, ARCHIVE_ACCEPT);
        if let Some(token) = credential.filter(|t| !t.is_empty()) {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let mut response = request.send().await.map_err(describe)?;
        if response.status() != StatusCode::OK {
            return Err(InstallError::DownloadStatus(response.status().as_u16()));
        }

        let temp = NamedTempFile::new()
            .map_err(|e| InstallError::Download(format!("Failed to create temp file: {}", e)))?;
        let handle = temp
            .as_file()
            .try_clone()
            .map_err(|e| InstallError::Download(e.to_string()))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(describe)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| InstallError::Download(format!("Failed to write archive: {}", e)))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| InstallError::Download(e.to_string()))?;

        log::debug!("Downloaded {} bytes from {}", written, url);
        Ok(temp)
    }
}

fn describe(err: reqwest::Error) -> InstallError {
    if err.is_timeout() {
        InstallError::Download("Download timed out".to_string())
    } else if err.is_connect() {
        InstallError::Download("Failed to connect to the download host".to_string())
    } else {
        InstallError::Download(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_authenticated_download() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widget/zipball")
            .match_header("authorization", "token ghp_secret")
            .match_header("accept", ARCHIVE_ACCEPT)
            .with_status(200)
            .with_body("PK-bytes")
            .create_async()
            .await;

        let temp = Downloader::new()
            .unwrap()
            .download(
                &format!("{}/repos/acme/widget/zipball", server.url()),
                Some("ghp_secret"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(temp.path()).unwrap(), b"PK-bytes");
    }

    #[tokio::test]
    async fn test_anonymous_download_sends_no_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/archive.zip")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("data")
            .create_async()
            .await;

        Downloader::new()
            .unwrap()
            .download(&format!("{}/archive.zip", server.url()), None)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/secret/zipball")
            .with_status(404)
            .create_async()
            .await;

        let err = Downloader::new()
            .unwrap()
            .download(
                &format!("{}/repos/acme/secret/zipball", server.url()),
                Some("ghp_x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::DownloadStatus(404)));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_download_error() {
        let err = Downloader::new()
            .unwrap()
            .download("http://127.0.0.1:1/archive.zip", None)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Download(_)));
    }
}
