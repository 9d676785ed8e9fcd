//! Text generation: the collaborator that writes narrative text.
//!
//! The ledger treats text generation as unreliable. Every caller has a
//! deterministic fallback, so a generator only has to report failure
//! honestly; it never has to succeed.

#[cfg(test)]
pub mod mock;
mod openai;

use async_trait::async_trait;

pub use openai::OpenAiGenerator;

/// Errors a text generator can report.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("empty response")]
    Empty,
}

/// A single prompt-in, text-out request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    /// 0.0-2.0.
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 200,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier for logs, e.g. the model name.
    fn id(&self) -> &str;

    /// Generate text for a prompt. Blank output is reported as [`GenerateError::Empty`].
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerateError>;
}

/// Generator used when none is configured: always unavailable.
///
/// Every narrative then comes from the deterministic fallbacks.
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn id(&self) -> &'static str {
        "offline"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerateError> {
        Err(GenerateError::Unavailable(
            "no text generator configured".to_string(),
        ))
    }
}
