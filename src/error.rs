//! Error types for QuizBase.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read .env: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// Generative-AI provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Flashcard lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Gemini API key not configured")]
    MissingApiKey,

    #[error("Gemini API error: {status}")]
    Extraction { status: u16 },

    #[error("Custom Search request failed: {0}")]
    CustomSearch(String),

    #[error("Custom Search API error: HTTP {status}")]
    CustomSearchStatus { status: u16, body: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Presentation channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
