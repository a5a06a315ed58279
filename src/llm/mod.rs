//! Generative-AI integration for QuizBase.
//!
//! Gemini is called directly over REST through reqwest so the Google Search
//! grounding tool can be attached to a request.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider};

use std::sync::Arc;

use crate::config::Config;

/// Create the generative-AI provider from configuration.
pub fn create_provider(config: &Config, client: reqwest::Client) -> Arc<dyn LlmProvider> {
    if config.gemini_api_key.is_some() {
        tracing::info!("Using Gemini (model: {})", config.model);
    } else {
        tracing::warn!("GEMINI_API_KEY not set; searches will fail until it is configured");
    }
    Arc::new(GeminiProvider::new(
        client,
        config.gemini_api_key.clone(),
        config.model.clone(),
        config.gemini_base_url.clone(),
    ))
}
