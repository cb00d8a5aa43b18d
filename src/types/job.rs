//! The inbound job payload.
//!
//! A job is submitted upstream (voice capture -> controlling API -> queue) and is
//! read-only for the whole time the runner holds it.

use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// Base branch used when a job does not name one.
pub const DEFAULT_BASE_BRANCH: &str = "main";

fn default_branch() -> String {
    DEFAULT_BASE_BRANCH.to_string()
}

/// One requested code change against a target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,

    /// Source URL of the target repository, SSH (`git@host:owner/name.git`) or HTTPS.
    pub repo: String,

    /// Free-form instruction transcribed from the user's voice request.
    pub task_text: String,

    /// Base branch the feature branch is cut from and the PR targets.
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Conventions to follow when generating code (e.g. "PEP8, use argparse").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_guide: Option<String>,
}

impl Job {
    /// Creates a job against the default base branch with no user or style guide.
    pub fn new(
        job_id: impl Into<JobId>,
        repo: impl Into<String>,
        task_text: impl Into<String>,
    ) -> Self {
        Job {
            job_id: job_id.into(),
            repo: repo.into(),
            task_text: task_text.into(),
            branch: default_branch(),
            user_id: None,
            style_guide: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_style_guide(mut self, style_guide: impl Into<String>) -> Self {
        self.style_guide = Some(style_guide.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Decodes a queue message body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_defaults_to_main() {
        let job = Job::from_json(
            r#"{"job_id":"t1","repo":"git@github.com:user/demo.git","task_text":"Add a --help flag"}"#,
        )
        .unwrap();

        assert_eq!(job.job_id, JobId::from("t1"));
        assert_eq!(job.branch, "main");
        assert_eq!(job.user_id, None);
        assert_eq!(job.style_guide, None);
    }

    #[test]
    fn decodes_full_payload() {
        let body = serde_json::json!({
            "job_id": "test-runner-123",
            "user_id": "00000000-0000-0000-0000-000000000000",
            "repo": "git@github.com:user/demo-project.git",
            "task_text": "Add a --help flag to the CLI tool",
            "branch": "develop",
            "style_guide": "PEP8, use argparse, avoid globals"
        });

        let job = Job::from_json(&body.to_string()).unwrap();

        assert_eq!(job.branch, "develop");
        assert_eq!(
            job.style_guide.as_deref(),
            Some("PEP8, use argparse, avoid globals")
        );
        assert_eq!(
            job.user_id.as_deref(),
            Some("00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = Job::from_json(r#"{"job_id":"t1","repo":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("task_text"));
    }

    #[test]
    fn builder_matches_decoded() {
        let built = Job::new("t2", "https://github.com/acme/widgets.git", "Read from stdin")
            .with_style_guide("rustfmt");
        let decoded = Job::from_json(&serde_json::to_string(&built).unwrap()).unwrap();
        assert_eq!(built, decoded);
    }
}
