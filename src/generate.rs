//! Generative-text collaborator.
//!
//! Theme naming, summarization, and action drafting all ask a language model
//! for prose, and all of them must keep working when it is down. Component
//! code depends only on the [`Generator`] trait and selects its deterministic
//! fallback by matching on [`GenerationError`]; it never asks which
//! implementation it was handed.
//!
//! Implementations:
//!
//! - [`OfflineGenerator`]: always unavailable, so every stage takes its
//!   fallback path. Useful for reproducible runs.
//! - Any `Fn(&str, Duration) -> Result<String, GenerationError>` closure.
//! - `ChatCompletionsGenerator` (feature `http`): a blocking client for
//!   OpenAI-compatible endpoints.

use std::time::{Duration, Instant};

/// Failure modes of a generation call. Always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The collaborator could not produce text.
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline.
    #[error("generation timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },
}

impl GenerationError {
    pub(crate) fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

/// A source of generated text.
///
/// Implementations must give up once `timeout` has elapsed and report
/// [`GenerationError::Timeout`]; the pipeline never waits longer than that.
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;
}

impl<F> Generator for F
where
    F: Fn(&str, Duration) -> Result<String, GenerationError> + Send + Sync,
{
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        self(prompt, timeout)
    }
}

/// A generator that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl Generator for OfflineGenerator {
    fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable("offline".to_string()))
    }
}

/// Call a generator, holding it to its deadline.
///
/// A response that arrives after `timeout` is discarded as a timeout, and a
/// blank response counts as unavailable. The returned text is trimmed.
pub fn call_with_deadline(
    generator: &dyn Generator,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GenerationError> {
    let started = Instant::now();
    let text = generator.generate(prompt, timeout)?;
    if started.elapsed() > timeout {
        return Err(GenerationError::timeout(timeout));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Unavailable("empty response".to_string()));
    }
    Ok(text.to_string())
}

/// Where a generated value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Produced by the language model.
    Model,
    /// Produced by the deterministic fallback.
    Fallback {
        /// Why the model path was abandoned.
        reason: String,
    },
}

/// A value together with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    /// The produced value.
    pub value: T,
    /// Model or fallback.
    pub origin: Origin,
}

impl<T> Generated<T> {
    /// Wrap a model-produced value.
    pub fn model(value: T) -> Self {
        Self {
            value,
            origin: Origin::Model,
        }
    }

    /// Wrap a fallback value.
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            origin: Origin::Fallback {
                reason: reason.into(),
            },
        }
    }

    /// Whether the fallback path produced this value.
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, Origin::Fallback { .. })
    }

    /// The fallback reason, if any.
    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.origin {
            Origin::Model => None,
            Origin::Fallback { reason } => Some(reason),
        }
    }

    /// Discard the origin.
    pub fn into_inner(self) -> T {
        self.value
    }
}
