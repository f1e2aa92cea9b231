//! Private repository access checks

use super::GitHubApi;
use super::models::Repository;
use crate::error::{ApiError, Result};

/// Outcome of a successful access probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCheck {
    /// Repository is private and the credential can read it
    Private,
    /// Repository turned out to be public; usable, with a note for the user
    PublicRepository(String),
}

/// Private repository details with the access probe result
#[derive(Debug, Clone)]
pub struct PrivateRepoDetails {
    pub repository: Repository,
    pub access: AccessCheck,
}

/// Probe whether the configured credential can read `owner/repo`.
///
/// Requires a credential. A 404, 401 or 403 from the probe surfaces as the
/// matching [`ApiError`]; a public repository is not an error.
pub async fn verify_private_repo_access<C>(api: &C, owner: &str, repo: &str) -> Result<AccessCheck>
where
    C: GitHubApi + ?Sized,
{
    if !api.has_credential() {
        return Err(ApiError::MissingToken.into());
    }

    let probe = api.probe_repo(owner, repo).await?;
    if probe.private {
        Ok(AccessCheck::Private)
    } else {
        Ok(AccessCheck::PublicRepository(format!(
            "Note: Repository \"{}/{}\" is public. It will work, but you may want to use the regular search instead.",
            owner, repo
        )))
    }
}

/// Verify access, then fetch full details.
pub async fn get_private_repo_details<C>(
    api: &C,
    owner: &str,
    repo: &str,
) -> Result<PrivateRepoDetails>
where
    C: GitHubApi + ?Sized,
{
    let access = verify_private_repo_access(api, owner, repo).await?;
    let repository = api.get_repo(owner, repo).await?;
    Ok(PrivateRepoDetails { repository, access })
}
