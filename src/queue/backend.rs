//! Runtime selection between the mock and SQS queues.

use super::{AckToken, Delivery, JobQueue, MockQueue, QueueError, SqsQueue};

/// The queue chosen at startup.
#[derive(Debug)]
pub enum QueueBackend {
    Mock(MockQueue),
    Sqs(SqsQueue),
}

impl QueueBackend {
    pub fn is_mock(&self) -> bool {
        matches!(self, QueueBackend::Mock(_))
    }

    /// Returns the mock queue, for seeding jobs.
    pub fn as_mock_mut(&mut self) -> Option<&mut MockQueue> {
        match self {
            QueueBackend::Mock(queue) => Some(queue),
            QueueBackend::Sqs(_) => None,
        }
    }
}

impl JobQueue for QueueBackend {
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
        match self {
            QueueBackend::Mock(queue) => queue.receive().await,
            QueueBackend::Sqs(queue) => queue.receive().await,
        }
    }

    async fn delete(&mut self, token: AckToken) -> Result<(), QueueError> {
        match self {
            QueueBackend::Mock(queue) => queue.delete(token).await,
            QueueBackend::Sqs(queue) => queue.delete(token).await,
        }
    }
}
