//! Amazon SQS job queue.

use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::{debug, info};

use crate::types::Job;

use super::{AckToken, Delivery, JobQueue, QueueError};

/// Long-poll wait per receive.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(10);

/// How long a received message stays hidden from other consumers.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_REGION: &str = "us-east-1";

/// SDK-level attempts per request.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: String,
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
}

impl SqsConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        SqsConfig {
            queue_url: queue_url.into(),
            region: DEFAULT_REGION.to_string(),
            wait_time: DEFAULT_WAIT_TIME,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

/// A queue backed by one SQS queue URL.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    config: SqsConfig,
}

impl SqsQueue {
    /// Connects using the default AWS credential chain.
    pub async fn connect(config: SqsConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .load()
            .await;
        info!(queue_url = %config.queue_url, region = %config.region, "Connected to SQS");
        SqsQueue {
            client: Client::new(&shared),
            config,
        }
    }
}

fn secs_i32(d: Duration) -> i32 {
    i32::try_from(d.as_secs()).unwrap_or(i32::MAX)
}

/// Builds a delivery from the parts of a received message.
///
/// A missing body is treated as an empty object, which then fails to decode.
fn decode_message(
    message_id: Option<&str>,
    body: Option<&str>,
    receipt_handle: Option<&str>,
) -> Result<Delivery, QueueError> {
    let job = Job::from_json(body.unwrap_or("{}")).map_err(|source| QueueError::Decode {
        message_id: message_id.unwrap_or("<unknown>").to_string(),
        source,
    })?;
    Ok(Delivery {
        job,
        token: receipt_handle.map(AckToken::new),
    })
}

impl JobQueue for SqsQueue {
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(secs_i32(self.config.wait_time))
            .visibility_timeout(secs_i32(self.config.visibility_timeout))
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };
        debug!(message_id = message.message_id().unwrap_or("<unknown>"), "Received message");

        decode_message(message.message_id(), message.body(), message.receipt_handle()).map(Some)
    }

    async fn delete(&mut self, token: AckToken) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(token.as_str())
            .send()
            .await
            .map_err(|e| QueueError::Delete(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_long_poll_settings() {
        let config = SqsConfig::new("https://sqs.us-east-1.amazonaws.com/123/jobs");
        assert_eq!(config.wait_time, Duration::from_secs(10));
        assert_eq!(config.visibility_timeout, Duration::from_secs(60));
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn message_decodes_into_delivery_with_token() {
        let body = r#"{"job_id":"j1","repo":"git@github.com:a/b.git","task_text":"Add a --help flag"}"#;

        let delivery = decode_message(Some("m1"), Some(body), Some("receipt-1")).unwrap();

        assert_eq!(delivery.job.job_id.as_str(), "j1");
        assert_eq!(delivery.job.branch, "main");
        assert_eq!(delivery.token, Some(AckToken::new("receipt-1")));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = decode_message(Some("m2"), Some("not json"), Some("r")).unwrap_err();
        match err {
            QueueError::Decode { message_id, .. } => assert_eq!(message_id, "m2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_body_is_decode_error() {
        assert!(matches!(
            decode_message(None, None, None),
            Err(QueueError::Decode { .. })
        ));
    }

    #[test]
    fn oversized_durations_saturate() {
        assert_eq!(secs_i32(Duration::from_secs(u64::MAX)), i32::MAX);
        assert_eq!(secs_i32(DEFAULT_WAIT_TIME), 10);
    }
}
