//! Blocking client for OpenAI-compatible chat completion endpoints.

use std::time::Duration;

use serde_json::{json, Value};

use crate::{GenerationError, Generator};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A [`Generator`] backed by a `/v1/chat/completions` endpoint.
///
/// ## Example
///
/// ```rust,ignore
/// use reviewpulse::ChatCompletionsGenerator;
///
/// let generator = ChatCompletionsGenerator::new("http://127.0.0.1:8111", "llama-3.2-3b")?
///     .with_api_key(std::env::var("LLM_API_KEY")?);
/// ```
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::blocking::Client,
}

impl ChatCompletionsGenerator {
    /// Create a client for `base_url` (with or without the completions path).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unavailable`] if the HTTP client cannot be
    /// built (for example, no TLS backend).
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self, GenerationError> {
        let endpoint = if base_url.ends_with(COMPLETIONS_PATH) {
            base_url.to_string()
        } else {
            format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/'))
        };

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: model.into(),
            api_key: None,
            max_tokens: 500,
            temperature: 0.2,
            client,
        })
    }

    /// Send a bearer token with every request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Cap the completion length.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The resolved completions URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Generator for ChatCompletionsGenerator {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let mut request = self.client.post(&self.endpoint).timeout(timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                GenerationError::timeout(timeout)
            } else {
                GenerationError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "endpoint returned {status}: {text}"
            )));
        }

        let payload: Value = response
            .json()
            .map_err(|e| GenerationError::Unavailable(format!("bad response body: {e}")))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| GenerationError::Unavailable("response has no content".to_string()))
    }
}
