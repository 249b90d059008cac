mod client;
mod git;
pub mod naming;

pub use client::GitHubHost;
use git::parse_porcelain;

use crate::error::HostingError;
use crate::model::{RepositoryInfo, ReviewRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Nothing staged; re-committing an unchanged tree is a no-op
    NoChanges,
}

/// Version-control hosting: local git operations plus the review-request API.
#[async_trait]
pub trait VcsHost: Send + Sync {
    /// Clone the base branch into `dest`, replacing whatever is there
    async fn clone_repository(
        &self,
        repo: &RepositoryInfo,
        dest: &Path,
    ) -> Result<PathBuf, HostingError>;

    /// Check out `branch` from `base`, resetting it if it already exists
    async fn create_branch(
        &self,
        workspace: &Path,
        base: &str,
        branch: &str,
    ) -> Result<(), HostingError>;

    async fn commit(&self, workspace: &Path, message: &str) -> Result<CommitOutcome, HostingError>;

    async fn push(&self, workspace: &Path, branch: &str) -> Result<(), HostingError>;

    /// Open a review request from `head` into the repository's base branch.
    ///
    /// An already-open request for the same head/base is returned instead of
    /// creating a duplicate.
    async fn open_review_request(
        &self,
        repo: &RepositoryInfo,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<ReviewRequest, HostingError>;
}

/// Files changed in the working tree, as (modified, created)
pub async fn working_tree_changes(
    workspace: &Path,
) -> Result<(Vec<String>, Vec<String>), HostingError> {
    let status = git::run_git(workspace, &["status", "--porcelain"], None).await?;
    Ok(parse_porcelain(&status))
}
