//! Pull request creation on the hosting platform.
//!
//! The git workflow only needs two capabilities from GitHub: finding an already-open PR
//! for a head branch (so a redelivered job does not open a duplicate) and opening a new
//! one. Both sit behind [`PullRequestOpener`] so the workflow can be exercised with an
//! in-memory fake.

mod client;
mod error;

use std::future::Future;

use crate::types::RepoId;

pub use client::{OctocrabClient, install_crypto_provider};
pub use error::{GitHubApiError, GitHubErrorKind};

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    /// Branch with the change.
    pub head: String,
    /// Branch the PR targets.
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Opens pull requests against arbitrary repositories.
pub trait PullRequestOpener: Send + Sync {
    /// Returns the URL of an open PR whose head is `head`, if one exists.
    fn find_open_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
    ) -> impl Future<Output = Result<Option<String>, GitHubApiError>> + Send;

    /// Opens a PR and returns its URL.
    fn open_pull_request(
        &self,
        repo: &RepoId,
        spec: &PullRequestSpec,
    ) -> impl Future<Output = Result<String, GitHubApiError>> + Send;
}
