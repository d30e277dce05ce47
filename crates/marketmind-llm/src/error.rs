//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Admission queue is at capacity
    #[error("Reasoning queue is full ({depth} requests pending)")]
    QueueFull {
        /// Configured maximum depth
        depth: usize,
    },

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error (missing API key, bad base URL)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Stable code for logs and stage error messages
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            Self::QueueFull { .. } => "LLM_QUEUE_FULL",
            Self::AuthenticationFailed | Self::ConfigurationError(_) => "MISSING_API_KEY",
            Self::SerializationError(_) | Self::UnexpectedResponse(_) => "LLM_PARSE_ERROR",
            _ => "LLM_ERROR",
        }
    }

    /// Whether the provider asked us to slow down
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded(_))
    }

    /// Whether retrying later could succeed
    ///
    /// Credential problems never resolve on their own.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed | Self::ConfigurationError(_) | Self::ModelNotFound(_)
        )
    }
}
