//! Remote classification through an OpenAI-compatible chat completion API
//! with log-probability support (vLLM, llama.cpp server, OpenAI, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BackendError, DEFAULT_MODEL, DecisionBackend, Evidence, MODEL_ENV, TokenLogprob, http_client,
    resolve_setting, validate_base_url,
};
use crate::prompt::PromptRequest;

/// Environment variable read for the chat API base URL.
pub const BASE_URL_ENV: &str = "PRETZEL_BASE_URL";
/// Environment variable read for the chat API key.
pub const API_KEY_ENV: &str = "PRETZEL_API_KEY";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";
const DEFAULT_API_KEY: &str = "EMPTY";
const DEFAULT_TOP_LOGPROBS: u8 = 2;
const DEFAULT_MAX_TOKENS: u32 = 2;

/// Builder for constructing `ChatCompletionClient` instances.
///
/// # Examples
///
/// ```
/// use pretzel::backend::ChatCompletionClientBuilder;
///
/// let client = ChatCompletionClientBuilder::new()
///     .base_url("http://localhost:8000/v1")
///     .model("meta-llama/Meta-Llama-3-8B-Instruct")
///     .top_logprobs(5)
///     .logit_bias("198", -100.0)
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "http://localhost:8000/v1");
/// ```
#[derive(Debug, Default)]
pub struct ChatCompletionClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    top_logprobs: Option<u8>,
    max_tokens: Option<u32>,
    logit_bias: BTreeMap<String, f32>,
}

impl ChatCompletionClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL, including any version prefix (e.g.
    /// `http://localhost:8000/v1`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Number of candidate tokens to request at each generated position.
    pub fn top_logprobs(mut self, k: u8) -> Self {
        self.top_logprobs = Some(k);
        self
    }

    /// Caps the number of generated tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Biases a token id. A large negative bias keeps the model away from
    /// degenerate first tokens such as whitespace or newlines.
    pub fn logit_bias(mut self, token_id: impl Into<String>, bias: f32) -> Self {
        self.logit_bias.insert(token_id.into(), bias);
        self
    }

    /// Builds the client.
    ///
    /// Unset values fall back to `PRETZEL_BASE_URL`, `PRETZEL_API_KEY` and
    /// `PRETZEL_MODEL`, then to `http://localhost:8000/v1`, `EMPTY` and
    /// [`DEFAULT_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` for an unparsable base URL.
    pub fn build(self) -> Result<ChatCompletionClient, BackendError> {
        let base_url = resolve_setting(self.base_url, BASE_URL_ENV, DEFAULT_BASE_URL);

        Ok(ChatCompletionClient {
            client: http_client()?,
            base_url: validate_base_url(&base_url)?,
            api_key: resolve_setting(self.api_key, API_KEY_ENV, DEFAULT_API_KEY),
            model: resolve_setting(self.model, MODEL_ENV, DEFAULT_MODEL),
            top_logprobs: self.top_logprobs.unwrap_or(DEFAULT_TOP_LOGPROBS),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            logit_bias: self.logit_bias,
        })
    }
}

/// Synchronous client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Issues one request per prompt and returns the top candidate tokens of
/// the first generated position with their log-probabilities.
pub struct ChatCompletionClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    top_logprobs: u8,
    max_tokens: u32,
    logit_bias: BTreeMap<String, f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    logprobs: bool,
    top_logprobs: u8,
    max_tokens: u32,
    #[serde(skip_serializing_if = "no_bias")]
    logit_bias: &'a BTreeMap<String, f32>,
}

fn no_bias(bias: &&BTreeMap<String, f32>) -> bool {
    bias.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Debug, Deserialize)]
struct ChoiceLogprobs {
    content: Option<Vec<PositionLogprobs>>,
}

#[derive(Debug, Deserialize)]
struct PositionLogprobs {
    token: String,
    logprob: f64,
    #[serde(default)]
    top_logprobs: Vec<CandidateLogprob>,
}

#[derive(Debug, Deserialize)]
struct CandidateLogprob {
    token: String,
    logprob: f64,
}

impl ChatCompletionClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn top_logprobs(&self) -> u8 {
        self.top_logprobs
    }

    fn request_body<'a>(&'a self, request: &'a PromptRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        ChatCompletionRequest {
            model: &self.model,
            messages,
            logprobs: true,
            top_logprobs: self.top_logprobs,
            max_tokens: self.max_tokens,
            logit_bias: &self.logit_bias,
        }
    }
}

/// Pulls the candidate tokens of the first generated position out of a
/// chat completion response body.
///
/// When the server reports no alternatives for that position, the sampled
/// token itself is the only candidate.
fn first_position_logprobs(body: &str) -> Result<Vec<TokenLogprob>, BackendError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(BackendError::Serialization)?;

    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::api("Response contained no choices"))?
        .logprobs
        .and_then(|logprobs| logprobs.content)
        .and_then(|positions| positions.into_iter().next())
        .ok_or_else(|| BackendError::api("Response did not include log-probabilities"))?;

    if first.top_logprobs.is_empty() {
        return Ok(vec![TokenLogprob::new(first.token, first.logprob)]);
    }
    Ok(first
        .top_logprobs
        .into_iter()
        .map(|candidate| TokenLogprob::new(candidate.token, candidate.logprob))
        .collect())
}

impl DecisionBackend for ChatCompletionClient {
    fn evidence(&self, request: &PromptRequest) -> Result<Evidence, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .map_err(BackendError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(BackendError::transport)?;
        let candidates = first_position_logprobs(&body)?;
        debug!(request_id = request.id, ?candidates, "Chat completion log-probabilities");
        Ok(Evidence::TokenLogprobs(candidates))
    }
}
