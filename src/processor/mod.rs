//! Turns one job into one result.
//!
//! Two paths:
//!
//! - **Mock**: no generation backend is configured. A canned result is chosen by
//!   [`mock::mock_result`] after a simulated delay.
//! - **Generation**: the backend is asked for code. On success the code is either handed
//!   to the [`GitWorkflow`] (git integration enabled) or reported as `code_generated`.
//!
//! [`JobProcessor::process`] never fails: every error becomes a `backend_error` or
//! `git_error` result. `duration_ms` is always the measured wall-clock time of the call.

pub mod mock;

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::generation::{CodeGenerator, build_prompt};
use crate::git::GitWorkflow;
use crate::git::workflow::GENERATED_FILE;
use crate::github::PullRequestOpener;
use crate::types::{Job, JobResult, JobStatus};

/// Default simulated processing time on the mock path.
pub const DEFAULT_MOCK_LATENCY: Duration = Duration::from_secs(2);

/// Configuration for the job processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Delay before a mock result is returned.
    pub mock_latency: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorConfig {
    pub fn new() -> Self {
        ProcessorConfig {
            mock_latency: DEFAULT_MOCK_LATENCY,
        }
    }

    /// Returns a config with no simulated delay.
    pub fn instant() -> Self {
        ProcessorConfig {
            mock_latency: Duration::ZERO,
        }
    }
}

/// Number of newline-delimited segments in `content`.
///
/// A trailing newline counts as an extra (empty) segment.
fn estimate_loc(content: &str) -> u64 {
    content.split('\n').count() as u64
}

/// Orchestrates generation and git (or the mock path) for single jobs.
pub struct JobProcessor<G, P> {
    config: ProcessorConfig,
    generator: Option<G>,
    git: Option<GitWorkflow<P>>,
}

impl<G: CodeGenerator, P: PullRequestOpener> JobProcessor<G, P> {
    /// Creates a processor. Without a `generator`, every job takes the mock path and
    /// `git` is unused.
    pub fn new(config: ProcessorConfig, generator: Option<G>, git: Option<GitWorkflow<P>>) -> Self {
        JobProcessor {
            config,
            generator,
            git,
        }
    }

    /// Returns true if jobs are served by the mock path.
    pub fn is_mock(&self) -> bool {
        self.generator.is_none()
    }

    /// Processes `job` and returns its result, stamped with the measured duration.
    #[instrument(skip_all, fields(job_id = %job.job_id))]
    pub async fn process(&self, job: &Job) -> JobResult {
        let started = Instant::now();
        info!(task = %job.task_text, repo = %job.repo, "Processing job");

        let result = match &self.generator {
            None => self.process_mock(job).await,
            Some(generator) => self.process_generated(generator, job).await,
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(status = %result.status, duration_ms, "Processing finished");
        result.with_duration_ms(duration_ms)
    }

    async fn process_mock(&self, job: &Job) -> JobResult {
        if !self.config.mock_latency.is_zero() {
            tokio::time::sleep(self.config.mock_latency).await;
        }
        mock::mock_result(job)
    }

    async fn process_generated(&self, generator: &G, job: &Job) -> JobResult {
        let prompt = build_prompt(job);
        let generation = match generator.generate(&prompt).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "Generation failed");
                return JobResult::backend_error(
                    job.job_id.clone(),
                    format!("Code generation failed: {}", e),
                );
            }
        };

        let Some(git) = &self.git else {
            return JobResult::code_generated(
                job.job_id.clone(),
                estimate_loc(&generation.content),
                vec![GENERATED_FILE.to_string()],
            )
            .with_tokens(generation.tok_in, generation.tok_out)
            .with_notes("Code generated; git integration disabled, nothing was pushed");
        };

        let result = git
            .run(job, &generation.content)
            .await
            .for_job(job.job_id.clone())
            .with_tokens(generation.tok_in, generation.tok_out);

        if result.status == JobStatus::PrOpened {
            result.with_checks(true, true)
        } else {
            result
        }
    }
}
