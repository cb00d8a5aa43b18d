//! Repository URL handling.
//!
//! Jobs name their target repository by clone URL. Two forms are understood:
//!
//! - SCP-like SSH: `git@github.com:owner/name.git`
//! - HTTPS: `https://github.com/owner/name.git` (optionally with userinfo,
//!   e.g. `https://token@github.com/owner/name.git`)
//!
//! The `.git` suffix is optional in both. Anything else (other schemes, missing
//! owner, nested paths) is rejected, since the PR step needs exactly one owner and
//! one repository name.

use thiserror::Error;

use crate::types::RepoId;

/// Username GitHub expects when a token is used as an HTTPS password.
const TOKEN_USERNAME: &str = "x-access-token";

/// Errors from parsing a repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoUrlError {
    /// The URL is neither `git@host:...` nor `https://host/...`.
    #[error("unsupported repository URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The host part is empty.
    #[error("repository URL has no host: {0}")]
    MissingHost(String),

    /// The path is not exactly `owner/name`.
    #[error("repository URL path must be owner/name: {0}")]
    InvalidPath(String),
}

/// Parses a clone URL into owner and repository name.
///
/// # Examples
///
/// ```
/// use codevox_runner::git::parse_repo_url;
///
/// let id = parse_repo_url("git@github.com:acme/widgets.git").unwrap();
/// assert_eq!((id.owner.as_str(), id.repo.as_str()), ("acme", "widgets"));
/// ```
pub fn parse_repo_url(url: &str) -> Result<RepoId, RepoUrlError> {
    let (host, path) = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')
            .ok_or_else(|| RepoUrlError::InvalidPath(url.to_string()))?
    } else if let Some(rest) = url.strip_prefix("https://") {
        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| RepoUrlError::InvalidPath(url.to_string()))?;
        // Drop any userinfo (`token@host`)
        let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        (host, path)
    } else {
        return Err(RepoUrlError::UnsupportedScheme(url.to_string()));
    };

    if host.is_empty() {
        return Err(RepoUrlError::MissingHost(url.to_string()));
    }

    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepoId::new(owner, name))
        }
        _ => Err(RepoUrlError::InvalidPath(url.to_string())),
    }
}

/// A prefix substitution applied to job URLs before git contacts the remote, in the
/// manner of git's `url.<base>.insteadOf`. Used to route clones through a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRewrite {
    /// Prefix matched against the job's URL.
    pub instead_of: String,
    /// What the matched prefix is replaced with.
    pub base: String,
}

impl UrlRewrite {
    pub fn new(instead_of: impl Into<String>, base: impl Into<String>) -> Self {
        UrlRewrite {
            instead_of: instead_of.into(),
            base: base.into(),
        }
    }

    /// Parses comma-separated `<prefix>=<replacement>` pairs.
    ///
    /// Pairs without `=` or with an empty prefix are skipped.
    pub fn parse_list(value: &str) -> Vec<UrlRewrite> {
        value
            .split(',')
            .filter_map(|pair| {
                let (instead_of, base) = pair.trim().split_once('=')?;
                (!instead_of.is_empty()).then(|| UrlRewrite::new(instead_of, base))
            })
            .collect()
    }
}

/// Applies the rewrite with the longest matching prefix, if any.
pub fn rewrite_url(url: &str, rewrites: &[UrlRewrite]) -> String {
    rewrites
        .iter()
        .filter(|r| url.starts_with(&r.instead_of))
        .max_by_key(|r| r.instead_of.len())
        .map_or_else(
            || url.to_string(),
            |r| format!("{}{}", r.base, &url[r.instead_of.len()..]),
        )
}

/// Embeds a token into an HTTPS GitHub URL.
///
/// Returns `None` when the URL is not a plain `https://github.com/...` URL (SSH URLs,
/// local paths, URLs that already carry userinfo) or no token is given; the caller
/// then uses the URL unchanged.
///
/// The returned string contains the token and must never be logged.
pub fn authenticated_url(url: &str, token: Option<&str>) -> Option<String> {
    let token = token.filter(|t| !t.is_empty())?;
    let rest = url.strip_prefix("https://github.com/")?;
    Some(format!(
        "https://{}:{}@github.com/{}",
        TOKEN_USERNAME, token, rest
    ))
}
