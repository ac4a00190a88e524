//! Inference backends.
//!
//! Every backend satisfies one contract, [`DecisionBackend`]: given a
//! prompt, return the evidence needed to decide yes or no. Two
//! implementations are provided:
//!
//! - [`OllamaBatchClient`] runs a local model through the Ollama HTTP API.
//!   It takes a whole batch of prompts in one call and returns generated
//!   text tagged by request id.
//! - [`ChatCompletionClient`] calls an OpenAI-compatible chat endpoint once
//!   per prompt. It returns the top-k token log-probabilities of the first
//!   generated token.
//!
//! Both clients are built with a builder. A value set on the builder takes
//! precedence over an environment variable, which takes precedence over the
//! built-in default.

mod chat;
mod error;
mod ollama;

use std::time::Duration;

pub use chat::{ChatCompletionClient, ChatCompletionClientBuilder};
pub use error::BackendError;
pub use ollama::{OllamaBatchClient, OllamaBatchClientBuilder};

use crate::prompt::PromptRequest;

/// Model used when neither the builder nor `PRETZEL_MODEL` names one.
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Environment variable naming the model for both backends.
pub const MODEL_ENV: &str = "PRETZEL_MODEL";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the blocking HTTP client shared by both backends.
fn http_client() -> Result<reqwest::blocking::Client, BackendError> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(BackendError::Network)
}

/// Resolves a setting: builder value, then environment variable, then default.
fn resolve_setting(value: Option<String>, env: &str, default: &str) -> String {
    value
        .or_else(|| std::env::var(env).ok())
        .unwrap_or_else(|| default.to_string())
}

/// Validates a base URL and strips any trailing slash.
fn validate_base_url(base_url: &str) -> Result<String, BackendError> {
    reqwest::Url::parse(base_url)
        .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    Ok(base_url.trim_end_matches('/').to_string())
}

/// A candidate token and its natural-log probability.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
}

impl TokenLogprob {
    pub fn new(token: impl Into<String>, logprob: f64) -> Self {
        Self {
            token: token.into(),
            logprob,
        }
    }
}

/// What a backend returns for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Decoded generated text.
    Text(String),
    /// Top candidate tokens at the first generated position.
    TokenLogprobs(Vec<TokenLogprob>),
}

/// Evidence tagged with the id of the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvidence {
    pub request_id: usize,
    pub evidence: Evidence,
}

/// Generated text tagged with the id of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub request_id: usize,
    pub text: String,
}

/// Decoding parameters for text generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// `0.0` selects greedy (deterministic) decoding.
    pub temperature: f32,
    pub top_p: f32,
    /// `None` leaves top-k sampling to the backend's default.
    pub top_k: Option<u32>,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Greedy decoding capped at `max_tokens`.
    pub fn greedy(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Self::default()
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.9,
            top_k: None,
            max_tokens: 2,
        }
    }
}

/// Contract for backends that can answer a yes/no classification prompt.
///
/// This trait enables mocking in unit tests and hides decoding parameters
/// and transport from the pipeline.
pub trait DecisionBackend: Send + Sync {
    /// Sends one prompt and returns the evidence for its verdict.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the response lacks the
    /// expected data.
    fn evidence(&self, request: &PromptRequest) -> Result<Evidence, BackendError>;

    /// Sends a batch of prompts and returns evidence tagged by request id.
    ///
    /// `on_answer` is called with the number of answers collected so far,
    /// each time one arrives. The default implementation calls
    /// [`DecisionBackend::evidence`] for each request in order. Output order
    /// is not guaranteed in general; callers map results back by
    /// `request_id`.
    fn evidence_batch(
        &self,
        requests: &[PromptRequest],
        on_answer: &mut dyn FnMut(usize),
    ) -> Result<Vec<TaggedEvidence>, BackendError> {
        let mut tagged = Vec::with_capacity(requests.len());
        for request in requests {
            tagged.push(TaggedEvidence {
                request_id: request.id,
                evidence: self.evidence(request)?,
            });
            on_answer(tagged.len());
        }
        Ok(tagged)
    }

    /// Whether the pipeline should submit all prompts through
    /// [`DecisionBackend::evidence_batch`] in one call.
    fn submits_batches(&self) -> bool {
        false
    }
}

/// Contract for backends that generate free text for a batch of prompts.
pub trait TextGenerator: Send + Sync {
    /// Generates text for every request, tagged by request id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if any request fails.
    fn generate_batch(
        &self,
        requests: &[PromptRequest],
        params: &SamplingParams,
    ) -> Result<Vec<Generation>, BackendError>;
}
