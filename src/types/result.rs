//! The outcome record reported to the controlling API.
//!
//! Every processing path (mock, generation-only, generation + git) produces exactly one
//! [`JobResult`] per job. The result is built through per-status constructors so that a
//! value always carries the fields its status implies; fields that do not apply to a
//! status are left `None` and omitted from the JSON payload.
//!
//! # Non-authoritative fields
//!
//! `tests_passed`, `lint_passed` and (on the generation path) `loc_delta` are
//! heuristics. Generated code is never executed or linted before it is pushed, so the
//! check flags are always `true` on success, and `loc_delta` is a line count of the
//! generated file rather than a diff stat. Consumers must not gate merges on them.

use serde::{Deserialize, Serialize};

use super::ids::{JobId, Sha};

/// Outcome category of a processed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The change was small enough to merge without review.
    AutoMerged,

    /// The change was pushed to a feature branch and (if configured) a PR was opened.
    PrOpened,

    /// Code was generated but git integration is disabled, so nothing was pushed.
    CodeGenerated,

    /// The generation backend was unreachable or rejected the request.
    BackendError,

    /// A clone/branch/commit/push/PR step failed.
    GitError,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::AutoMerged => "auto_merged",
            JobStatus::PrOpened => "pr_opened",
            JobStatus::CodeGenerated => "code_generated",
            JobStatus::BackendError => "backend_error",
            JobStatus::GitError => "git_error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured outcome of processing one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<Sha>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,

    /// The feature branch the change was pushed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Lines changed. Heuristic on the generation path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc_delta: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_touched: Vec<String>,

    /// Always `true` on success; nothing is actually run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,

    /// Always `true` on success; nothing is actually linted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_passed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tok_in: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tok_out: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl JobResult {
    fn bare(job_id: JobId, status: JobStatus) -> Self {
        JobResult {
            job_id,
            status,
            commit_sha: None,
            pr_url: None,
            branch: None,
            loc_delta: None,
            files_touched: Vec::new(),
            tests_passed: None,
            lint_passed: None,
            tok_in: None,
            tok_out: None,
            duration_ms: None,
            notes: None,
        }
    }

    /// A change that was committed and merged without review.
    pub fn auto_merged(
        job_id: JobId,
        commit_sha: Sha,
        loc_delta: u64,
        files_touched: Vec<String>,
    ) -> Self {
        JobResult {
            commit_sha: Some(commit_sha),
            loc_delta: Some(loc_delta),
            files_touched,
            ..Self::bare(job_id, JobStatus::AutoMerged)
        }
    }

    /// A change that was pushed for review.
    ///
    /// Attach the commit, branch and PR URL with the `with_*` methods; the PR URL stays
    /// `None` when no hosting integration is configured.
    pub fn pr_opened(job_id: JobId, loc_delta: u64, files_touched: Vec<String>) -> Self {
        JobResult {
            loc_delta: Some(loc_delta),
            files_touched,
            ..Self::bare(job_id, JobStatus::PrOpened)
        }
    }

    /// Code was generated but not committed anywhere.
    pub fn code_generated(job_id: JobId, loc_delta: u64, files_touched: Vec<String>) -> Self {
        JobResult {
            loc_delta: Some(loc_delta),
            files_touched,
            ..Self::bare(job_id, JobStatus::CodeGenerated)
        }
    }

    pub fn backend_error(job_id: JobId, notes: impl Into<String>) -> Self {
        JobResult {
            notes: Some(notes.into()),
            ..Self::bare(job_id, JobStatus::BackendError)
        }
    }

    pub fn git_error(job_id: JobId, notes: impl Into<String>) -> Self {
        JobResult {
            notes: Some(notes.into()),
            ..Self::bare(job_id, JobStatus::GitError)
        }
    }

    pub fn with_commit(mut self, commit_sha: Sha) -> Self {
        self.commit_sha = Some(commit_sha);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_pr_url(mut self, pr_url: Option<String>) -> Self {
        self.pr_url = pr_url;
        self
    }

    pub fn with_checks(mut self, tests_passed: bool, lint_passed: bool) -> Self {
        self.tests_passed = Some(tests_passed);
        self.lint_passed = Some(lint_passed);
        self
    }

    pub fn with_tokens(mut self, tok_in: u32, tok_out: u32) -> Self {
        self.tok_in = Some(tok_in);
        self.tok_out = Some(tok_out);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Replaces the job ID.
    ///
    /// The git workflow reports under the job it was given, but the processor re-stamps
    /// the ID so the callback always matches the dequeued job.
    pub fn for_job(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::AutoMerged),
            Just(JobStatus::PrOpened),
            Just(JobStatus::CodeGenerated),
            Just(JobStatus::BackendError),
            Just(JobStatus::GitError),
        ]
    }

    proptest! {
        #[test]
        fn status_serializes_as_its_wire_name(status in arb_status()) {
            let json = serde_json::to_string(&status).unwrap();
            prop_assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn error_results_omit_success_fields() {
        let result = JobResult::git_error(JobId::from("j1"), "push rejected");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "job_id": "j1",
                "status": "git_error",
                "notes": "push rejected"
            })
        );
    }

    #[test]
    fn auto_merged_carries_commit_and_files() {
        let result = JobResult::auto_merged(
            JobId::from("t1"),
            Sha::from("abc123456"),
            15,
            vec!["cli.py".to_string(), "README.md".to_string()],
        )
        .with_checks(true, true)
        .with_tokens(1200, 400)
        .with_duration_ms(2000);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "auto_merged");
        assert_eq!(json["commit_sha"], "abc123456");
        assert_eq!(json["files_touched"], serde_json::json!(["cli.py", "README.md"]));
        assert_eq!(json["tests_passed"], true);
        assert_eq!(json["tok_in"], 1200);
        assert!(json.get("pr_url").is_none());
    }

    #[test]
    fn pr_opened_without_hosting_has_no_url() {
        let result = JobResult::pr_opened(JobId::from("j2"), 3, vec!["f.py".to_string()])
            .with_commit(Sha::from("d".repeat(40)))
            .with_branch("codevox/feature-j2")
            .with_pr_url(None);

        assert_eq!(result.status, JobStatus::PrOpened);
        assert_eq!(result.branch.as_deref(), Some("codevox/feature-j2"));
        assert!(result.pr_url.is_none());
    }
}
