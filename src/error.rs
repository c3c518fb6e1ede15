//! Error types for the financial advisor pipeline

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat-completion endpoint answered without any choices.
    #[error("Failed to get response from language model")]
    EmptyCompletion,

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}
