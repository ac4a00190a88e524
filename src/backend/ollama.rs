//! Local batch inference through the Ollama HTTP API.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BackendError, DEFAULT_MODEL, DecisionBackend, Evidence, Generation, MODEL_ENV, SamplingParams,
    TaggedEvidence, TextGenerator, http_client, resolve_setting, validate_base_url,
};
use crate::prompt::PromptRequest;

/// Environment variable read for the Ollama base URL.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Builder for constructing `OllamaBatchClient` instances.
///
/// # Examples
///
/// ```
/// use pretzel::backend::{OllamaBatchClientBuilder, SamplingParams};
///
/// let client = OllamaBatchClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("llama3:8b")
///     .sampling(SamplingParams::greedy(2))
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "llama3:8b");
/// ```
#[derive(Debug, Default)]
pub struct OllamaBatchClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    sampling: Option<SamplingParams>,
}

impl OllamaBatchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API (e.g. `http://localhost:11434`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name used for every request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the decoding parameters used when answering classification
    /// prompts. Defaults to greedy decoding capped at two tokens.
    pub fn sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Builds the client.
    ///
    /// If `base_url()` was not called, `OLLAMA_HOST` is used, falling back to
    /// `http://localhost:11434`. If `model()` was not called, `PRETZEL_MODEL`
    /// is used, falling back to [`DEFAULT_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` for an unparsable base URL.
    pub fn build(self) -> Result<OllamaBatchClient, BackendError> {
        let base_url = resolve_setting(self.base_url, OLLAMA_HOST_ENV, DEFAULT_OLLAMA_HOST);
        let base_url = validate_base_url(&base_url)?;
        let model = resolve_setting(self.model, MODEL_ENV, DEFAULT_MODEL);

        Ok(OllamaBatchClient {
            client: http_client()?,
            base_url,
            model,
            sampling: self.sampling.unwrap_or_default(),
        })
    }
}

/// Batch text generation against a local Ollama server.
///
/// A batch is submitted with a single call. The client works through it
/// prompt by prompt and returns every generation tagged with its request id.
pub struct OllamaBatchClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    sampling: SamplingParams,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    num_predict: u32,
}

impl From<&SamplingParams> for GenerateOptions {
    fn from(params: &SamplingParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            num_predict: params.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

impl OllamaBatchClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    /// Generates text for a single prompt via `POST /api/generate`.
    fn generate_one(
        &self,
        request: &PromptRequest,
        params: &SamplingParams,
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.user,
            system: request.system.as_deref(),
            stream: false,
            options: params.into(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(BackendError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(BackendError::transport)?;
        let text = parse_generate_response(&text)?;
        debug!(request_id = request.id, response = %text, "Ollama generation");
        Ok(text)
    }
}

/// Extracts the generated text from an `/api/generate` response body.
fn parse_generate_response(body: &str) -> Result<String, BackendError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(BackendError::Serialization)?;
    match (parsed.response, parsed.error) {
        (_, Some(message)) => Err(BackendError::api(message)),
        (Some(text), None) => Ok(text),
        (None, None) => Err(BackendError::api("Missing 'response' field in API response")),
    }
}

impl TextGenerator for OllamaBatchClient {
    fn generate_batch(
        &self,
        requests: &[PromptRequest],
        params: &SamplingParams,
    ) -> Result<Vec<Generation>, BackendError> {
        requests
            .iter()
            .map(|request| {
                Ok(Generation {
                    request_id: request.id,
                    text: self.generate_one(request, params)?,
                })
            })
            .collect()
    }
}

impl DecisionBackend for OllamaBatchClient {
    fn evidence(&self, request: &PromptRequest) -> Result<Evidence, BackendError> {
        self.generate_one(request, &self.sampling).map(Evidence::Text)
    }

    fn evidence_batch(
        &self,
        requests: &[PromptRequest],
        on_answer: &mut dyn FnMut(usize),
    ) -> Result<Vec<TaggedEvidence>, BackendError> {
        let mut tagged = Vec::with_capacity(requests.len());
        for request in requests {
            let text = self.generate_one(request, &self.sampling)?;
            tagged.push(TaggedEvidence {
                request_id: request.id,
                evidence: Evidence::Text(text),
            });
            on_answer(tagged.len());
        }
        Ok(tagged)
    }

    fn submits_batches(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn build_uses_default_url_when_base_url_not_called() {
        unsafe {
            std::env::remove_var(OLLAMA_HOST_ENV);
        }

        let client = OllamaBatchClientBuilder::new().build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    #[serial]
    fn build_reads_ollama_host_environment_variable_if_set() {
        unsafe {
            std::env::set_var(OLLAMA_HOST_ENV, "http://custom-host:11434");
        }

        let client = OllamaBatchClientBuilder::new().build().unwrap();
        assert_eq!(client.base_url(), "http://custom-host:11434");

        unsafe {
            std::env::remove_var(OLLAMA_HOST_ENV);
        }
    }

    #[test]
    #[serial]
    fn builder_url_takes_precedence_over_environment() {
        unsafe {
            std::env::set_var(OLLAMA_HOST_ENV, "http://env-var-host:11434");
        }

        let client = OllamaBatchClientBuilder::new()
            .base_url("http://builder-host:11434")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://builder-host:11434");

        unsafe {
            std::env::remove_var(OLLAMA_HOST_ENV);
        }
    }

    #[test]
    #[serial]
    fn build_uses_default_model_when_env_not_set() {
        unsafe {
            std::env::remove_var(MODEL_ENV);
        }

        let client = OllamaBatchClientBuilder::new().build().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn build_returns_error_if_invalid_url_provided() {
        let result = OllamaBatchClientBuilder::new()
            .base_url("not-a-valid-url")
            .build();
        assert!(matches!(result, Err(BackendError::InvalidUrl(_))));
    }

    #[test]
    fn default_sampling_is_greedy_two_tokens() {
        let client = OllamaBatchClientBuilder::new()
            .base_url("http://localhost:11434")
            .build()
            .unwrap();

        assert_eq!(client.sampling(), &SamplingParams::default());
        assert!(client.submits_batches());
    }

    #[test]
    fn request_body_carries_system_and_options() {
        let params = SamplingParams {
            temperature: 0.7,
            top_p: 0.95,
            top_k: Some(40),
            max_tokens: 100,
        };
        let body = GenerateRequest {
            model: "llama3:8b",
            prompt: "Is this marine?",
            system: Some("You are a classifier."),
            stream: false,
            options: (&params).into(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3:8b");
        assert_eq!(json["system"], "You are a classifier.");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["top_k"], 40);
        assert_eq!(json["options"]["num_predict"], 100);
    }

    #[test]
    fn request_body_omits_absent_system_and_top_k() {
        let body = GenerateRequest {
            model: "m",
            prompt: "p",
            system: None,
            stream: false,
            options: (&SamplingParams::default()).into(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert!(json["options"].get("top_k").is_none());
    }

    #[test]
    fn parses_generated_text() {
        let text = parse_generate_response(r#"{"response": "YES", "done": true}"#).unwrap();
        assert_eq!(text, "YES");
    }

    #[test]
    fn surfaces_api_error_message() {
        let result = parse_generate_response(r#"{"error": "model 'x' not found"}"#);
        assert!(matches!(result, Err(BackendError::Api { ref message }) if message.contains("not found")));
    }

    #[test]
    fn missing_response_field_is_an_api_error() {
        let result = parse_generate_response(r#"{"done": true}"#);
        assert!(matches!(result, Err(BackendError::Api { .. })));
    }

    #[test]
    fn unreachable_server_is_a_transport_error() {
        let client = OllamaBatchClientBuilder::new()
            .base_url("http://127.0.0.1:65535")
            .build()
            .unwrap();

        let result = client.evidence(&PromptRequest::new(0, "test prompt"));
        assert!(matches!(
            result,
            Err(BackendError::Network(_) | BackendError::Timeout(_))
        ));
    }
}
