//! Octocrab-backed pull request client.
//!
//! Unlike a bot that serves a single repository, the runner targets whatever repository
//! each job names, so the client is not repo-scoped: every call takes a [`RepoId`].

use octocrab::Octocrab;
use tracing::{debug, info};

use crate::types::RepoId;

use super::error::GitHubApiError;
use super::{PullRequestOpener, PullRequestSpec};

/// A GitHub API client authenticated as the runner's bot account.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client from a GitHub token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        install_crypto_provider();
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}

/// Installs the process-wide rustls provider octocrab's HTTPS connector needs.
///
/// Several providers are linked into the binary, so rustls cannot pick one itself.
pub fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Err only if another thread installed one first.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
}

fn fallback_pr_url(repo: &RepoId, number: u64) -> String {
    format!("https://github.com/{}/pull/{}", repo, number)
}

impl PullRequestOpener for OctocrabClient {
    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
    ) -> Result<Option<String>, GitHubApiError> {
        // The `head` filter requires the `owner:branch` form.
        let page = self
            .client
            .pulls(&repo.owner, &repo.repo)
            .list()
            .state(octocrab::params::State::Open)
            .head(format!("{}:{}", repo.owner, head))
            .per_page(1)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let existing = page.items.into_iter().next().map(|pr| {
            pr.html_url
                .map(|u| u.to_string())
                .unwrap_or_else(|| fallback_pr_url(repo, pr.number))
        });
        debug!(repo = %repo, head, found = existing.is_some(), "Looked up open pull request");
        Ok(existing)
    }

    async fn open_pull_request(
        &self,
        repo: &RepoId,
        spec: &PullRequestSpec,
    ) -> Result<String, GitHubApiError> {
        let pr = self
            .client
            .pulls(&repo.owner, &repo.repo)
            .create(&spec.title, &spec.head, &spec.base)
            .body(&spec.body)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let url = pr
            .html_url
            .map(|u| u.to_string())
            .unwrap_or_else(|| fallback_pr_url(repo, pr.number));
        info!(repo = %repo, number = pr.number, url = %url, "Opened pull request");
        Ok(url)
    }
}
