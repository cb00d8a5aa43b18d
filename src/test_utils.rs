//! Shared test fixtures: local git origins, in-memory fakes for the external
//! capabilities, a throwaway HTTP server, and proptest strategies.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tempfile::TempDir;

use crate::generation::{CodeGenerator, Generation, GenerationError};
use crate::github::{GitHubApiError, GitHubErrorKind, PullRequestOpener, PullRequestSpec};
use crate::types::{Job, JobId, RepoId, Sha};

// ─── Git fixtures ─────────────────────────────────────────────────────────────

/// Runs git synchronously with the same isolated environment as production code,
/// panicking on failure. Returns trimmed stdout.
pub fn git_sync(workdir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(workdir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare repository standing in for a remote, with `main` holding one seed commit.
pub struct OriginRepo {
    dir: TempDir,
    bare: PathBuf,
}

impl OriginRepo {
    /// Path of the bare repository.
    pub fn path(&self) -> &Path {
        &self.bare
    }

    /// The clone URL (a local path).
    pub fn url(&self) -> String {
        self.bare.to_string_lossy().into_owned()
    }

    pub fn main_sha(&self) -> Sha {
        Sha::new(git_sync(&self.bare, &["rev-parse", "refs/heads/main"]))
    }

    /// Commits `content` to `filename` (which may contain `/`) on `main`.
    pub fn commit_file(&self, filename: &str, content: &str) {
        let work = tempfile::tempdir_in(self.dir.path()).unwrap();
        git_sync(work.path(), &["clone", "--branch", "main", &self.url(), "."]);
        git_sync(work.path(), &["config", "user.email", "test@test.com"]);
        git_sync(work.path(), &["config", "user.name", "Test"]);
        let path = work.path().join(filename);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        git_sync(work.path(), &["add", "--", filename]);
        git_sync(work.path(), &["commit", "-m", &format!("Add {}", filename)]);
        git_sync(work.path(), &["push", "origin", "HEAD:main"]);
    }

    /// Installs a pre-receive hook that rejects every push.
    #[cfg(unix)]
    pub fn reject_pushes(&self) {
        use std::os::unix::fs::PermissionsExt;

        let hook = self.bare.join("hooks").join("pre-receive");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, "#!/bin/sh\necho 'pushes are disabled' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// Creates a bare origin whose `main` branch has a README commit.
pub fn init_origin_repo() -> OriginRepo {
    let dir = TempDir::new().unwrap();
    let bare = dir.path().join("origin.git");
    std::fs::create_dir_all(&bare).unwrap();
    git_sync(&bare, &["init", "--bare"]);
    git_sync(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let work = dir.path().join("seed");
    std::fs::create_dir_all(&work).unwrap();
    git_sync(&work, &["init"]);
    git_sync(&work, &["config", "user.email", "test@test.com"]);
    git_sync(&work, &["config", "user.name", "Test"]);
    std::fs::write(work.join("README.md"), "# Demo project\n").unwrap();
    git_sync(&work, &["add", "."]);
    git_sync(&work, &["commit", "-m", "Initial commit"]);
    git_sync(&work, &["remote", "add", "origin", bare.to_str().unwrap()]);
    git_sync(&work, &["push", "origin", "HEAD:refs/heads/main"]);

    OriginRepo { dir, bare }
}

// ─── Fake hosting platform ────────────────────────────────────────────────────

#[derive(Default)]
struct FakePrState {
    existing: HashMap<String, String>,
    opened: Vec<(RepoId, PullRequestSpec)>,
    fail_with: Option<GitHubErrorKind>,
}

/// In-memory [`PullRequestOpener`] that records every PR it is asked to open.
#[derive(Clone, Default)]
pub struct FakePrOpener {
    state: Arc<Mutex<FakePrState>>,
}

impl FakePrOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretends an open PR with `url` already exists for `head`.
    pub fn with_existing(self, head: &str, url: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .existing
            .insert(head.to_string(), url.to_string());
        self
    }

    /// Makes every call fail with an error of `kind`.
    pub fn failing(self, kind: GitHubErrorKind) -> Self {
        self.state.lock().unwrap().fail_with = Some(kind);
        self
    }

    pub fn opened(&self) -> Vec<(RepoId, PullRequestSpec)> {
        self.state.lock().unwrap().opened.clone()
    }

    fn check_failure(&self) -> Result<(), GitHubApiError> {
        match self.state.lock().unwrap().fail_with {
            Some(GitHubErrorKind::Transient) => {
                Err(GitHubApiError::transient_without_source("service unavailable"))
            }
            Some(GitHubErrorKind::Permanent) => {
                Err(GitHubApiError::permanent_without_source("Validation Failed"))
            }
            None => Ok(()),
        }
    }
}

impl PullRequestOpener for FakePrOpener {
    async fn find_open_pull_request(
        &self,
        _repo: &RepoId,
        head: &str,
    ) -> Result<Option<String>, GitHubApiError> {
        self.check_failure()?;
        Ok(self.state.lock().unwrap().existing.get(head).cloned())
    }

    async fn open_pull_request(
        &self,
        repo: &RepoId,
        spec: &PullRequestSpec,
    ) -> Result<String, GitHubApiError> {
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        state.opened.push((repo.clone(), spec.clone()));
        let url = format!("https://github.com/{}/pull/{}", repo, state.opened.len());
        state.existing.insert(spec.head.clone(), url.clone());
        Ok(url)
    }
}

// ─── Fake generation backend ──────────────────────────────────────────────────

/// In-memory [`CodeGenerator`] returning a canned response and recording prompts.
#[derive(Clone)]
pub struct FakeGenerator {
    response: Option<Generation>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn returning(content: &str, tok_in: u32, tok_out: u32) -> Self {
        FakeGenerator {
            response: Some(Generation {
                content: content.to_string(),
                tok_in,
                tok_out,
            }),
            prompts: Arc::default(),
        }
    }

    /// A backend whose every request fails with HTTP 500.
    pub fn failing() -> Self {
        FakeGenerator {
            response: None,
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CodeGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone().ok_or_else(|| GenerationError::Api {
            status: 500,
            message: "internal server error".to_string(),
        })
    }
}

// ─── HTTP ─────────────────────────────────────────────────────────────────────

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ─── Strategies ───────────────────────────────────────────────────────────────

pub fn arb_job_id() -> impl Strategy<Value = JobId> {
    "[a-z0-9][a-z0-9-]{0,35}".prop_map(JobId::new)
}

/// Task text, sometimes containing the mock classifier's keywords in any case.
pub fn arb_task_text() -> impl Strategy<Value = String> {
    let keyword = prop_oneof![
        Just(String::new()),
        Just("help".to_string()),
        Just("HELP".to_string()),
        Just("stdin".to_string()),
        Just("StdIn".to_string()),
    ];
    ("[a-zA-Z ,.-]{0,40}", keyword, "[a-zA-Z ,.-]{0,40}")
        .prop_map(|(before, keyword, after)| format!("{}{}{}", before, keyword, after))
}

pub fn arb_job() -> impl Strategy<Value = Job> {
    (
        arb_job_id(),
        "[a-z]{1,12}",
        "[a-z]{1,12}",
        arb_task_text(),
        prop::option::of("[A-Za-z0-9, ]{1,40}"),
    )
        .prop_map(|(id, owner, name, task, style)| {
            let job = Job::new(id, format!("git@github.com:{}/{}.git", owner, name), task);
            match style {
                Some(style) => job.with_style_guide(style),
                None => job,
            }
        })
}
