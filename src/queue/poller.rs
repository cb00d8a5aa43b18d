//! Runner-facing wrapper around a [`JobQueue`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AckToken, Delivery, JobQueue, QueueError};

/// Pause after a failed receive before the next poll is allowed.
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Polls a queue one delivery at a time and acknowledges finished jobs.
#[derive(Debug)]
pub struct QueuePoller<Q> {
    queue: Q,
    error_delay: Duration,
}

impl<Q: JobQueue> QueuePoller<Q> {
    pub fn new(queue: Q) -> Self {
        QueuePoller {
            queue,
            error_delay: DEFAULT_ERROR_DELAY,
        }
    }

    pub fn with_error_delay(mut self, error_delay: Duration) -> Self {
        self.error_delay = error_delay;
        self
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Takes at most one job.
    ///
    /// Receive and decode failures are logged and reported as an empty poll, after
    /// waiting the error delay (cut short if `shutdown` fires).
    pub async fn poll(&mut self, shutdown: &CancellationToken) -> Option<Delivery> {
        match self.queue.receive().await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(error = %e, delay_secs = self.error_delay.as_secs(), "Queue receive failed");
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.error_delay) => {}
                }
                None
            }
        }
    }

    /// Redeems `token`, removing the message from the queue.
    ///
    /// Returns `Ok(false)` when there is no token (mock deliveries), `Ok(true)` when
    /// the message was deleted.
    pub async fn acknowledge(&mut self, token: Option<AckToken>) -> Result<bool, QueueError> {
        let Some(token) = token else {
            return Ok(false);
        };
        self.queue.delete(token).await?;
        debug!("Deleted message");
        Ok(true)
    }
}
