//! Code generation backend.
//!
//! The processor treats generation as an opaque request/response capability: one prompt
//! in, one block of source text plus token usage out. [`CodeGenerator`] is that seam;
//! [`AnthropicGenerator`] is the production implementation.
//!
//! Prompt and response bodies are never logged. Log lines carry [`hash_for_logging`]
//! digests and lengths instead.

mod anthropic;
mod prompt;

use std::future::Future;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use anthropic::{
    ANTHROPIC_API_URL, AnthropicConfig, AnthropicGenerator, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
pub use prompt::{build_prompt, extract_code};

/// Generated source text and the token usage it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub tok_in: u32,
    pub tok_out: u32,
}

/// Errors from a generation request. None of these are retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation backend rate limited the request")]
    RateLimited,

    #[error("generation backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid generation backend response: {0}")]
    InvalidResponse(String),

    #[error("generation backend returned no text content")]
    EmptyResponse,
}

/// Turns a prompt into source code.
pub trait CodeGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Generation, GenerationError>> + Send;
}

/// Returns a short SHA-256 digest of `content` (first 8 bytes, hex) for log correlation.
pub fn hash_for_logging(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..8])
}
