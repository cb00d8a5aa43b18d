//! Job intake.
//!
//! Jobs arrive through a [`JobQueue`]: either an in-process [`MockQueue`] or Amazon SQS
//! ([`SqsQueue`]). Delivery is at-least-once. A job taken from SQS stays in the queue,
//! hidden for the visibility timeout, until its [`AckToken`] is redeemed with
//! [`JobQueue::delete`]; if that never happens the message reappears and the job is
//! processed again.
//!
//! [`QueuePoller`] wraps a queue with the runner-facing contract: receive failures are
//! logged and turned into an empty poll after a short delay.

mod backend;
mod mock;
mod poller;
mod sqs;

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::types::Job;

pub use backend::QueueBackend;
pub use mock::{DEMO_JOB_ID, MockQueue, demo_job};
pub use poller::{DEFAULT_ERROR_DELAY, QueuePoller};
pub use sqs::{DEFAULT_REGION, DEFAULT_VISIBILITY_TIMEOUT, DEFAULT_WAIT_TIME, SqsConfig, SqsQueue};

/// Opaque handle that removes a received message from the queue when redeemed.
#[derive(Clone, PartialEq, Eq)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(handle: impl Into<String>) -> Self {
        AckToken(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shows only the last 8 characters of the handle.
impl fmt::Debug for AckToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
        write!(f, "AckToken(..{})", tail)
    }
}

/// A job together with the token that acknowledges it, if its source has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub job: Job,
    pub token: Option<AckToken>,
}

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to receive from queue: {0}")]
    Receive(String),

    #[error("failed to decode message {message_id}: {source}")]
    Decode {
        message_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to delete message: {0}")]
    Delete(String),
}

/// A source of jobs.
pub trait JobQueue: Send {
    /// Takes at most one pending job. `Ok(None)` means nothing is pending.
    fn receive(&mut self) -> impl Future<Output = Result<Option<Delivery>, QueueError>> + Send;

    /// Permanently removes the message identified by `token`.
    fn delete(&mut self, token: AckToken) -> impl Future<Output = Result<(), QueueError>> + Send;
}
