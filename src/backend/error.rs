use thiserror::Error;

/// Errors that can occur when talking to an inference backend.
///
/// None of these are retried: a failed request ends the run.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The Ollama server or chat-completion endpoint could not be reached.
    #[error("Could not reach the inference backend: {0}")]
    Network(#[source] reqwest::Error),

    /// A generation or chat-completion call exceeded the request timeout.
    #[error("Inference request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success status from `/api/generate` or `/chat/completions`.
    #[error("Inference backend returned HTTP {status}")]
    Http { status: u16 },

    /// The response body was not the JSON the backend protocol describes.
    #[error("Malformed backend response: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The backend answered without text or log-probabilities, or reported
    /// an error of its own.
    #[error("Inference backend error: {message}")]
    Api { message: String },

    /// Base URL given on the builder or through the environment does not parse.
    #[error("Invalid backend base URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Classifies a transport error as a timeout or a network failure.
    pub(crate) fn transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }

    pub(crate) fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }
}
