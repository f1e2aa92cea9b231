//! Error types for repopress

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for repopress operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Install(#[from] InstallError),

    /// The repository has no parsable readme or style.css headers
    #[error("{0}")]
    NoValidMetadata(String),

    /// Install refused; carries the compatibility verdict's reason
    #[error("{0}")]
    Incompatible(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the underlying cause is an upstream 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(ApiError::NotFound(_)))
    }

    /// Upstream HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(api) => api.status_code(),
            Error::Install(InstallError::DownloadStatus(code)) => Some(*code),
            _ => None,
        }
    }
}

/// GitHub API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(
        "Your access token is invalid or does not have permission to access this repository. Please check your token and ensure it has the \"repo\" scope."
    )]
    Unauthorized,

    #[error(
        "Your access token does not have permission to access this repository. Please ensure it has the \"repo\" scope."
    )]
    Forbidden,

    #[error(
        "{0} not found or you do not have access to it. Please verify the name and ensure your access token has the \"repo\" scope."
    )]
    NotFound(String),

    #[error(
        "GitHub API rate limit reached. Wait a while before trying again, or add a personal access token to raise the limit."
    )]
    RateLimited { status: u16 },

    #[error("GitHub API HTTP error: {status}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from GitHub API: {0}")]
    InvalidResponse(String),

    #[error("An access token is required to access private repositories.")]
    MissingToken,
}

impl ApiError {
    /// Map a non-success status to the matching error.
    ///
    /// `resource` names what was requested (e.g. `Repository "acme/widget"`);
    /// `body` is inspected to tell a 403 rate-limit apart from a scope problem.
    pub fn from_status(status: StatusCode, resource: &str, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => {
                if body.to_ascii_lowercase().contains("rate limit") {
                    ApiError::RateLimited { status: 403 }
                } else {
                    ApiError::Forbidden
                }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound(resource.to_string()),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { status: 429 },
            other => ApiError::Http {
                status: other.as_u16(),
                message: body.chars().take(200).collect(),
            },
        }
    }

    /// HTTP status code this error was produced from, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited { status } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to GitHub".to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Cache storage errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Could not determine a cache directory")]
    NoHome,

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Registry (tracked package store) errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(
        "Invalid repository format \"{0}\". Please use \"owner/repo\" format (e.g., mycompany/private-plugin)."
    )]
    InvalidFormat(String),

    #[error("Repository \"{0}\" is already in your monitored list.")]
    AlreadyTracked(String),

    #[error("Repository \"{0}\" is not being monitored.")]
    NotTracked(String),

    #[error("Failed to save repository: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Storage(err.to_string())
    }
}

/// Install pipeline stages, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStage {
    Resolved,
    Downloaded,
    Verified,
    Extracted,
    Renamed,
    Installed,
    Registered,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Resolved => "resolved",
            InstallStage::Downloaded => "downloaded",
            InstallStage::Verified => "verified",
            InstallStage::Extracted => "extracted",
            InstallStage::Renamed => "renamed",
            InstallStage::Installed => "installed",
            InstallStage::Registered => "registered",
        };
        f.write_str(name)
    }
}

/// Installer errors, one variant per failing stage
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Could not download the package: {0}")]
    Download(String),

    #[error(
        "Could not download the repository zip (HTTP {0}). Please verify your access token has the \"repo\" scope and that you can access this repository."
    )]
    DownloadStatus(u16),

    #[error("The downloaded archive is not a valid package: {0}")]
    Verify(String),

    #[error("Could not extract the package. Check free disk space and permissions: {0}")]
    Extract(String),

    #[error("Could not rename extracted folder from \"{from}\" to \"{to}\": {reason}")]
    Rename {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Could not move the package into place: {0}")]
    HostInstall(String),

    #[error("Package installed but could not be registered for updates: {0}")]
    Register(String),
}

impl InstallError {
    /// The stage the pipeline was trying to reach when it failed.
    pub fn stage(&self) -> InstallStage {
        match self {
            InstallError::Download(_) | InstallError::DownloadStatus(_) => InstallStage::Downloaded,
            InstallError::Verify(_) => InstallStage::Verified,
            InstallError::Extract(_) => InstallStage::Extracted,
            InstallError::Rename { .. } => InstallStage::Renamed,
            InstallError::HostInstall(_) => InstallStage::Installed,
            InstallError::Register(_) => InstallStage::Registered,
        }
    }
}
