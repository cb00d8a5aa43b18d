//! The git side effect sequence for one job.
//!
//! A run is a fixed pipeline of fallible steps executed in a fresh [`Workspace`]:
//!
//! 1. Create workspace
//! 2. Clone the job's repository (base branch only)
//! 3. Configure the bot commit identity on the clone
//! 4. Create `codevox/feature-<job_id>`
//! 5. Write the generated content to [`GENERATED_FILE`]
//! 6. Commit it
//! 7. Push the branch to `origin`
//! 8. Open a PR (only when a [`PullRequestOpener`] is configured)
//! 9. Remove the workspace
//!
//! Step 9 runs on every exit path. Steps never retry; a failed job is retried from
//! scratch when the queue redelivers it. To keep redelivery from piling up duplicates,
//! the push overwrites an existing branch of the same name and the PR step reuses an
//! already-open PR for that branch.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::github::{GitHubApiError, PullRequestOpener, PullRequestSpec};
use crate::types::{Job, JobId, JobResult, Sha};

use super::remote::{RepoUrlError, UrlRewrite, authenticated_url, parse_repo_url, rewrite_url};
use super::workspace::Workspace;
use super::{CommitIdentity, GitError, GitResult, remote_branch_sha, rev_parse, run_git};

/// File the generated content is written to, relative to the repository root.
pub const GENERATED_FILE: &str = "codevox_generated.py";

/// Prefix of every branch the runner pushes.
pub const BRANCH_PREFIX: &str = "codevox/feature-";

/// Maximum number of task-text characters used as the commit subject.
const COMMIT_SUBJECT_CHARS: usize = 50;

/// Maximum number of task-text characters used in the PR title.
const PR_TITLE_CHARS: usize = 60;

/// Returns the deterministic feature branch name for a job.
pub fn feature_branch_name(job_id: &JobId) -> String {
    format!("{}{}", BRANCH_PREFIX, job_id)
}

/// Truncates `text` to `max_chars` characters, appending `...` if anything was cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Returns the commit message for a job: the task text cut to 50 characters, or
/// `CodeVox job <job_id>` when the task text is blank.
pub fn commit_message(job_id: &JobId, task_text: &str) -> String {
    let task_text = task_text.trim();
    if task_text.is_empty() {
        return format!("CodeVox job {}", job_id);
    }
    truncate_chars(task_text, COMMIT_SUBJECT_CHARS)
}

fn pull_request_spec(job: &Job, branch: &str) -> PullRequestSpec {
    let mut body = format!(
        "Automated change generated by CodeVox.\n\n**Job:** `{}`\n\n**Task:**\n> {}\n",
        job.job_id,
        job.task_text.trim()
    );
    if let Some(style) = &job.style_guide {
        body.push_str(&format!("\n**Style guide:** {}\n", style));
    }
    body.push_str(
        "\nGenerated code was not executed or linted before this PR was opened.\n",
    );

    PullRequestSpec {
        head: branch.to_string(),
        base: job.branch.clone(),
        title: format!("[CodeVox] {}", truncate_chars(job.task_text.trim(), PR_TITLE_CHARS)),
        body,
    }
}

/// One step of the workflow, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    CreateWorkspace,
    Clone,
    ConfigureIdentity,
    Branch,
    Write,
    Commit,
    Push,
    OpenPr,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::CreateWorkspace => "create_workspace",
            WorkflowStep::Clone => "clone",
            WorkflowStep::ConfigureIdentity => "configure_identity",
            WorkflowStep::Branch => "branch",
            WorkflowStep::Write => "write",
            WorkflowStep::Commit => "commit",
            WorkflowStep::Push => "push",
            WorkflowStep::OpenPr => "open_pr",
        };
        f.write_str(name)
    }
}

/// Errors from a workflow run, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{step} failed: {source}")]
    Git {
        step: WorkflowStep,
        #[source]
        source: GitError,
    },

    #[error("open_pr failed: {0}")]
    RepoUrl(#[from] RepoUrlError),

    #[error("open_pr failed: {0}")]
    PullRequest(#[from] GitHubApiError),
}

impl WorkflowError {
    pub fn step(&self) -> WorkflowStep {
        match self {
            WorkflowError::Git { step, .. } => *step,
            WorkflowError::RepoUrl(_) | WorkflowError::PullRequest(_) => WorkflowStep::OpenPr,
        }
    }
}

/// Attaches a step label to a git failure.
trait AtStep<T> {
    fn at(self, step: WorkflowStep) -> Result<T, WorkflowError>;
}

impl<T> AtStep<T> for GitResult<T> {
    fn at(self, step: WorkflowStep) -> Result<T, WorkflowError> {
        self.map_err(|source| WorkflowError::Git { step, source })
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub commit_sha: Sha,
    pub branch: String,
    pub pr_url: Option<String>,
    /// Number of lines in the written file.
    pub loc_delta: u64,
}

/// Configuration for the git workflow.
#[derive(Clone)]
pub struct GitWorkflowConfig {
    /// Directory workspaces are created under.
    pub workspace_root: PathBuf,

    /// Author/committer of the generated commit.
    pub identity: CommitIdentity,

    /// Token embedded into HTTPS GitHub URLs for clone and push.
    pub token: Option<String>,

    /// Applied to the job's URL for clone and push. The PR step still uses the job's URL.
    pub url_rewrites: Vec<UrlRewrite>,
}

impl fmt::Debug for GitWorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitWorkflowConfig")
            .field("workspace_root", &self.workspace_root)
            .field("identity", &self.identity)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("url_rewrites", &self.url_rewrites)
            .finish()
    }
}

/// Executes the clone -> commit -> push -> PR sequence for jobs.
#[derive(Debug)]
pub struct GitWorkflow<P> {
    config: GitWorkflowConfig,
    github: Option<P>,
}

impl<P: PullRequestOpener> GitWorkflow<P> {
    /// Creates a workflow. Without a `github` client, runs stop after the push.
    pub fn new(config: GitWorkflowConfig, github: Option<P>) -> Self {
        GitWorkflow { config, github }
    }

    /// Runs the whole workflow for `job`, always returning a result.
    ///
    /// Success yields `pr_opened`; any failed step yields `git_error` with the step and
    /// cause in `notes`. The workspace is gone by the time this returns.
    #[instrument(skip(self, job, content), fields(job_id = %job.job_id))]
    pub async fn run(&self, job: &Job, content: &str) -> JobResult {
        let workspace = match Workspace::create(&self.config.workspace_root, &job.job_id) {
            Ok(ws) => ws,
            Err(e) => {
                let err = WorkflowError::Git {
                    step: WorkflowStep::CreateWorkspace,
                    source: GitError::Io(e),
                };
                warn!(error = %err, "Git workflow failed");
                return JobResult::git_error(job.job_id.clone(), err.to_string());
            }
        };
        debug!(workspace = %workspace.path().display(), "Created workspace");

        let outcome = self.run_steps(workspace.path(), job, content).await;

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!(
                workspace = %workspace_path.display(),
                error = %e,
                "Failed to remove workspace"
            );
        }

        match outcome {
            Ok(outcome) => {
                info!(
                    commit = %outcome.commit_sha.short(),
                    branch = %outcome.branch,
                    pr_url = outcome.pr_url.as_deref().unwrap_or("none"),
                    "Git workflow completed"
                );
                JobResult::pr_opened(
                    job.job_id.clone(),
                    outcome.loc_delta,
                    vec![GENERATED_FILE.to_string()],
                )
                .with_commit(outcome.commit_sha)
                .with_branch(outcome.branch)
                .with_pr_url(outcome.pr_url)
            }
            Err(err) => {
                let notes = self.redact(err.to_string());
                warn!(step = %err.step(), error = %notes, "Git workflow failed");
                JobResult::git_error(job.job_id.clone(), notes)
            }
        }
    }

    /// Steps 2-8. The caller owns the workspace and removes it afterwards.
    async fn run_steps(
        &self,
        dir: &Path,
        job: &Job,
        content: &str,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let token = self.config.token.as_deref();
        let fetch_url = rewrite_url(&job.repo, &self.config.url_rewrites);
        let remote = authenticated_url(&fetch_url, token).unwrap_or_else(|| fetch_url.clone());
        let branch = feature_branch_name(&job.job_id);

        // 2. Clone
        run_git(
            dir,
            &["clone", "--single-branch", "--branch", &job.branch, "--", &remote, "."],
        )
        .await
        .map_err(|e| self.redact_git(e))
        .at(WorkflowStep::Clone)?;
        if remote != fetch_url {
            // Keep the credential out of the clone's config
            run_git(dir, &["remote", "set-url", "origin", &fetch_url])
                .await
                .at(WorkflowStep::Clone)?;
        }

        // 3. Configure identity
        let identity = &self.config.identity;
        run_git(dir, &["config", "user.name", &identity.name])
            .await
            .at(WorkflowStep::ConfigureIdentity)?;
        run_git(dir, &["config", "user.email", &identity.email])
            .await
            .at(WorkflowStep::ConfigureIdentity)?;

        // 4. Branch
        run_git(dir, &["checkout", "-b", &branch])
            .await
            .at(WorkflowStep::Branch)?;

        // 5. Write
        tokio::fs::write(dir.join(GENERATED_FILE), content)
            .await
            .map_err(GitError::from)
            .at(WorkflowStep::Write)?;

        // 6. Commit
        run_git(dir, &["add", "--", GENERATED_FILE])
            .await
            .at(WorkflowStep::Commit)?;
        run_git(dir, &["commit", "-m", &commit_message(&job.job_id, &job.task_text)])
            .await
            .at(WorkflowStep::Commit)?;
        let commit_sha = rev_parse(dir, "HEAD").await.at(WorkflowStep::Commit)?;

        // 7. Push
        self.push_branch(dir, &remote, &branch)
            .await
            .map_err(|e| self.redact_git(e))
            .at(WorkflowStep::Push)?;

        // 8. Open PR
        let pr_url = match &self.github {
            Some(github) => Some(self.open_pull_request(github, job, &branch).await?),
            None => None,
        };

        Ok(WorkflowOutcome {
            commit_sha,
            branch,
            pr_url,
            loc_delta: content.lines().count() as u64,
        })
    }

    /// Pushes `HEAD` to `refs/heads/<branch>` on the remote.
    ///
    /// If the branch already exists (a previous delivery of the same job got this far),
    /// it is overwritten: the branch name is owned by the job, and the latest
    /// generation wins.
    async fn push_branch(&self, dir: &Path, remote: &str, branch: &str) -> GitResult<()> {
        let existing = remote_branch_sha(dir, remote, branch).await?;
        let refspec = format!("HEAD:refs/heads/{}", branch);

        let mut args = vec!["push"];
        if let Some(previous) = &existing {
            warn!(
                branch,
                previous = %previous.short(),
                "Feature branch already exists on remote, overwriting"
            );
            args.push("--force");
        }
        args.push("--");
        args.push(remote);
        args.push(&refspec);

        let output = super::git_command(dir).args(&args).output().await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("rejected") || stderr.contains("failed to push") {
            return Err(GitError::PushRejected { details: stderr });
        }
        Err(GitError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            stderr,
        })
    }

    async fn open_pull_request(
        &self,
        github: &P,
        job: &Job,
        branch: &str,
    ) -> Result<String, WorkflowError> {
        let repo = parse_repo_url(&job.repo)?;

        if let Some(url) = github.find_open_pull_request(&repo, branch).await? {
            info!(url = %url, "Reusing open pull request for feature branch");
            return Ok(url);
        }

        let spec = pull_request_spec(job, branch);
        Ok(github.open_pull_request(&repo, &spec).await?)
    }

    fn redact_git(&self, err: GitError) -> GitError {
        match &self.config.token {
            Some(token) => err.redact(token),
            None => err,
        }
    }

    fn redact(&self, text: String) -> String {
        match &self.config.token {
            Some(token) if !token.is_empty() => text.replace(token.as_str(), "***"),
            _ => text,
        }
    }
}
