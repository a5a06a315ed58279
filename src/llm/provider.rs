//! Provider abstraction for generative-AI completions.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single-prompt completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Let the model consult live web search before answering.
    pub grounding: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: 300,
            grounding: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }
}

/// Response from a completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// First candidate's first text part, trimmed. `None` when absent.
    pub text: Option<String>,
}

/// A generative-AI backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Whether credentials are present. Unconfigured providers fail lookups early.
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
