//! Result reporting to the controlling API.
//!
//! A job is only acknowledged on the queue after its result has been accepted here, so
//! [`CallbackSink::send`] reports plain success or failure and never errors.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::JobResult;

/// Endpoint path, relative to the API base URL.
pub const CALLBACK_PATH: &str = "/api/v1/callback/runner-status";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("callback rejected with HTTP {0}")]
    Rejected(u16),
}

/// Delivers results to whoever is waiting on them.
pub trait CallbackSink: Send + Sync {
    /// Returns true only if the result was accepted.
    fn send(&self, result: &JobResult) -> impl Future<Output = bool> + Send;
}

/// POSTs results as JSON to `<api_base_url>/api/v1/callback/runner-status`.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    url: String,
    client: reqwest::Client,
}

impl CallbackClient {
    pub fn new(api_base_url: &str) -> Result<Self, CallbackError> {
        Self::with_timeout(api_base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_base_url: &str, timeout: Duration) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(CallbackClient {
            url: format!("{}{}", api_base_url.trim_end_matches('/'), CALLBACK_PATH),
            client,
        })
    }

    /// The full callback URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `result`, treating any 2xx status as acceptance.
    pub async fn post(&self, result: &JobResult) -> Result<(), CallbackError> {
        let response = self.client.post(&self.url).json(result).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CallbackError::Rejected(status.as_u16()))
        }
    }
}

impl CallbackSink for CallbackClient {
    async fn send(&self, result: &JobResult) -> bool {
        match self.post(result).await {
            Ok(()) => {
                info!(job_id = %result.job_id, status = %result.status, "Callback sent");
                true
            }
            Err(e) => {
                warn!(job_id = %result.job_id, error = %e, "Callback failed");
                false
            }
        }
    }
}
