//! In-process FIFO queue for development and tests.

use std::collections::VecDeque;

use tracing::{info, warn};

use crate::types::Job;

use super::{AckToken, Delivery, JobQueue, QueueError};

/// ID of the job seeded by [`demo_job`].
pub const DEMO_JOB_ID: &str = "test-runner-123";

/// A sample job for exercising a freshly started runner in mock mode.
pub fn demo_job() -> Job {
    Job::new(
        DEMO_JOB_ID,
        "git@github.com:user/demo-project.git",
        "Add a --help flag to the CLI tool",
    )
    .with_user_id("00000000-0000-0000-0000-000000000000")
    .with_style_guide("PEP8, use argparse, avoid globals")
}

/// An in-memory job list. Deliveries carry no ack token; taking a job removes it.
#[derive(Debug, Default)]
pub struct MockQueue {
    jobs: VecDeque<Job>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job to the back of the queue.
    pub fn push(&mut self, job: Job) {
        info!(job_id = %job.job_id, "Received job");
        self.jobs.push_back(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl FromIterator<Job> for MockQueue {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        MockQueue {
            jobs: iter.into_iter().collect(),
        }
    }
}

impl JobQueue for MockQueue {
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
        Ok(self
            .jobs
            .pop_front()
            .map(|job| Delivery { job, token: None }))
    }

    async fn delete(&mut self, token: AckToken) -> Result<(), QueueError> {
        // Mock deliveries never carry a token, so there is nothing to delete.
        warn!(token = ?token, "Ignoring acknowledgment on mock queue");
        Ok(())
    }
}
