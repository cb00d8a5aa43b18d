//! Deterministic stand-in for generation + git.
//!
//! Used when no generation backend is configured. The outcome is chosen by a
//! case-insensitive keyword match on the task text, checked in order:
//!
//! | Keyword | Status | `loc_delta` | Files |
//! |---|---|---|---|
//! | `help` | `auto_merged` | 15 | `cli.py`, `README.md` |
//! | `stdin` | `auto_merged` | 25 | `cli.py`, `tests/test_cli.py` |
//! | otherwise | `pr_opened` | 150 | `cli.py`, `utils.py`, `tests/test_cli.py` |
//!
//! Nothing here touches the network or the filesystem.

use sha2::{Digest, Sha256};

use crate::types::{Job, JobId, JobResult, Sha};

/// Base of the synthetic PR URLs.
pub const MOCK_PR_BASE_URL: &str = "https://github.com/user/repo/pull";

fn files(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// A fake commit ID: `prefix` followed by six hex digits derived from the job ID.
///
/// Stable per job, so a redelivered mock job reports the same commit.
fn synthetic_commit(prefix: &str, job_id: &JobId) -> Sha {
    let digest = Sha256::digest(job_id.as_str().as_bytes());
    let hex = hex::encode(&digest[..3]);
    Sha::new(format!("{}{}", prefix, hex))
}

/// Produces the canned result for `job`.
pub fn mock_result(job: &Job) -> JobResult {
    let task = job.task_text.to_lowercase();
    let job_id = job.job_id.clone();

    if task.contains("help") {
        JobResult::auto_merged(
            job_id.clone(),
            synthetic_commit("abc", &job_id),
            15,
            files(&["cli.py", "README.md"]),
        )
        .with_checks(true, true)
        .with_tokens(1200, 400)
        .with_duration_ms(2000)
        .with_notes("Added --help flag with documentation")
    } else if task.contains("stdin") {
        JobResult::auto_merged(
            job_id.clone(),
            synthetic_commit("def", &job_id),
            25,
            files(&["cli.py", "tests/test_cli.py"]),
        )
        .with_checks(true, true)
        .with_tokens(1500, 600)
        .with_duration_ms(2500)
        .with_notes("Added --stdin flag with input handling")
    } else {
        let pr_url = format!("{}/{}", MOCK_PR_BASE_URL, job_id.prefix(8));
        JobResult::pr_opened(job_id, 150, files(&["cli.py", "utils.py", "tests/test_cli.py"]))
            .with_pr_url(Some(pr_url))
            .with_checks(true, true)
            .with_tokens(2000, 800)
            .with_duration_ms(3500)
            .with_notes("Added verbose logging - needs review due to size")
    }
}
