//! The poll -> process -> callback -> acknowledge loop.
//!
//! # Iteration
//!
//! 1. Poll the queue for at most one job. Nothing pending: sleep the idle backoff.
//! 2. Process the job on a separate task. The job always runs to completion.
//! 3. Send the result to the callback sink.
//! 4. Only if the callback succeeded, acknowledge the job on the queue. Otherwise the
//!    message stays hidden until its visibility timeout and is then redelivered.
//!
//! A panic anywhere in these steps ends the iteration with a [`RunnerError`] and
//! triggers the error backoff. The job is not acknowledged.
//!
//! # Shutdown
//!
//! The cancellation token is checked between iterations and interrupts backoff sleeps.
//! It never interrupts a job that has been taken off the queue.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::callback::CallbackSink;
use crate::generation::CodeGenerator;
use crate::github::PullRequestOpener;
use crate::processor::JobProcessor;
use crate::queue::{Delivery, JobQueue, QueuePoller};
use crate::types::{JobId, JobStatus};

use super::config::RunnerConfig;

/// Errors that escape a single loop iteration.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("processing job {job_id} panicked: {message}")]
    ProcessingPanicked { job_id: JobId, message: String },

    #[error("processing job {job_id} was aborted")]
    ProcessingAborted { job_id: JobId },

    /// Polling, reporting or acknowledging panicked.
    #[error("runner iteration panicked: {message}")]
    IterationPanicked { message: String },
}

impl RunnerError {
    fn from_join(job_id: JobId, err: JoinError) -> Self {
        if err.is_panic() {
            RunnerError::ProcessingPanicked {
                job_id,
                message: panic_message(err.into_panic()),
            }
        } else {
            RunnerError::ProcessingAborted { job_id }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// What one job went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Whether the callback sink accepted the result.
    pub callback_delivered: bool,
    /// Whether the queue message was deleted. Always false for mock deliveries.
    pub acknowledged: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The poll returned nothing.
    Idle,
    Processed(JobReport),
}

/// Counters accumulated over a [`Runner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    pub callbacks_failed: usize,
    pub acknowledged: usize,
    pub errors: usize,
}

/// The single-worker job loop.
pub struct Runner<Q, G, P, C> {
    config: RunnerConfig,
    poller: QueuePoller<Q>,
    processor: Arc<JobProcessor<G, P>>,
    callback: C,
}

impl<Q, G, P, C> Runner<Q, G, P, C>
where
    Q: JobQueue,
    G: CodeGenerator + 'static,
    P: PullRequestOpener + 'static,
    C: CallbackSink,
{
    pub fn new(
        config: RunnerConfig,
        poller: QueuePoller<Q>,
        processor: JobProcessor<G, P>,
        callback: C,
    ) -> Self {
        Runner {
            config,
            poller,
            processor: Arc::new(processor),
            callback,
        }
    }

    /// Runs one iteration without any backoff sleep.
    pub async fn tick(&mut self, shutdown: &CancellationToken) -> Result<Tick, RunnerError> {
        match AssertUnwindSafe(self.iterate(shutdown)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(RunnerError::IterationPanicked {
                message: panic_message(payload),
            }),
        }
    }

    async fn iterate(&mut self, shutdown: &CancellationToken) -> Result<Tick, RunnerError> {
        let Some(delivery) = self.poller.poll(shutdown).await else {
            return Ok(Tick::Idle);
        };
        self.handle(delivery).await.map(Tick::Processed)
    }

    #[instrument(skip_all, fields(job_id = %delivery.job.job_id))]
    async fn handle(&mut self, delivery: Delivery) -> Result<JobReport, RunnerError> {
        let Delivery { job, token } = delivery;
        let job_id = job.job_id.clone();
        info!("Picked up job");

        let started_at = Utc::now();
        let processor = Arc::clone(&self.processor);
        let result = tokio::spawn(async move { processor.process(&job).await })
            .await
            .map_err(|e| RunnerError::from_join(job_id.clone(), e))?;
        let finished_at = Utc::now();

        let callback_delivered = self.callback.send(&result).await;

        let acknowledged = if callback_delivered {
            info!(status = %result.status, "Job completed");
            match self.poller.acknowledge(token).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    // The callback already succeeded; redelivery reprocesses the job.
                    warn!(error = %e, "Failed to acknowledge job");
                    false
                }
            }
        } else {
            warn!(status = %result.status, "Callback failed, job left on queue");
            false
        };

        Ok(JobReport {
            job_id,
            status: result.status,
            callback_delivered,
            acknowledged,
            started_at,
            finished_at,
        })
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> RunStats {
        info!("Runner started, polling for jobs");
        let mut stats = RunStats::default();

        while !shutdown.is_cancelled() {
            match self.tick(&shutdown).await {
                Ok(Tick::Processed(report)) => {
                    stats.processed += 1;
                    if !report.callback_delivered {
                        stats.callbacks_failed += 1;
                    }
                    if report.acknowledged {
                        stats.acknowledged += 1;
                    }
                }
                Ok(Tick::Idle) => {
                    debug!("No jobs available");
                    backoff(self.config.idle_backoff, &shutdown).await;
                }
                Err(e) => {
                    error!(error = %e, "Runner iteration failed");
                    stats.errors += 1;
                    backoff(self.config.error_backoff, &shutdown).await;
                }
            }
        }

        info!(
            processed = stats.processed,
            callbacks_failed = stats.callbacks_failed,
            errors = stats.errors,
            "Runner stopped"
        );
        stats
    }
}

/// Sleeps for `delay` unless `shutdown` fires first.
async fn backoff(delay: Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}
