//! GitHub API data models
//!
//! Explicit shapes for every payload the client consumes. Fields GitHub may
//! omit are `Option` or `#[serde(default)]`.

mod content;
mod release;
mod repo;

pub use content::ContentFile;
pub use release::{ChangelogEntry, Release, strip_version_prefix};
pub use repo::{
    BranchCommit, BranchDetails, CommitData, CommitSignature, Contributor, License, Owner,
    Repository, SearchResponse,
};
