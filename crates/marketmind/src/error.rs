//! Error types for the analysis pipeline

use crate::stage::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identifiers for stage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Symbol failed validation
    InvalidSymbol,
    /// Provider could not resolve the symbol
    SymbolNotFound,
    /// Market data credentials are not configured
    MissingCredentials,
    /// Market data provider throttled us
    RateLimited,
    /// Any other market data failure
    MarketDataError,
    /// Technical stage used its heuristic
    TechAnalysisFallback,
    /// Fundamental stage used its heuristic
    FundamentalFallback,
    /// Sentiment stage used its heuristic
    SentimentFallback,
    /// Not enough price history for risk metrics
    InsufficientData,
    /// Risk stage used its fixed profile
    RiskFallback,
    /// Report stage synthesized locally
    ReportFallback,
    /// Pipeline-level fault outside any stage
    OrchestratorError,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSymbol => "INVALID_SYMBOL",
            Self::SymbolNotFound => "SYMBOL_NOT_FOUND",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::RateLimited => "RATE_LIMITED",
            Self::MarketDataError => "MARKET_DATA_ERROR",
            Self::TechAnalysisFallback => "TECH_ANALYSIS_FALLBACK",
            Self::FundamentalFallback => "FUNDAMENTAL_FALLBACK",
            Self::SentimentFallback => "SENTIMENT_FALLBACK",
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::RiskFallback => "RISK_FALLBACK",
            Self::ReportFallback => "REPORT_FALLBACK",
            Self::OrchestratorError => "ORCHESTRATOR_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by one stage of a run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{stage} stage failed with {code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct StageError {
    /// Stable error code
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
    /// Whether retrying the analysis could succeed
    pub recoverable: bool,
    /// Stage that raised the error
    pub stage: StageName,
}

impl StageError {
    /// Create an error
    pub fn new(
        stage: StageName,
        code: ErrorCode,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable,
            stage,
        }
    }

    /// Error absorbed by a fallback
    pub fn recoverable(stage: StageName, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(stage, code, message, true)
    }

    /// Error that ends the run
    pub fn fatal(stage: StageName, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(stage, code, message, false)
    }
}

/// Errors returned by market data sources
#[derive(Debug, Error)]
pub enum MarketError {
    /// Symbol failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Provider does not know the symbol
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Rate limit exceeded for provider
    #[error("Rate limit exceeded for {provider}")]
    RateLimited {
        /// Provider name
        provider: String,
    },

    /// Credentials required by the provider are missing
    #[error("Missing credentials for {provider}")]
    MissingCredentials {
        /// Provider name
        provider: String,
    },

    /// Network failure or 5xx; worth retrying
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        /// Requested symbol
        symbol: String,
        /// Why data is missing
        reason: String,
    },

    /// Any other provider failure
    #[error("Provider error: {0}")]
    Provider(String),
}

impl MarketError {
    /// Whether the market data stage should retry the fetch itself
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether a later analysis attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::MissingCredentials { .. })
    }

    /// Error code reported on the stage error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSymbol(_) => ErrorCode::InvalidSymbol,
            Self::SymbolNotFound(_) => ErrorCode::SymbolNotFound,
            Self::RateLimited { .. } => ErrorCode::RateLimited,
            Self::MissingCredentials { .. } => ErrorCode::MissingCredentials,
            Self::Transient(_) | Self::DataUnavailable { .. } | Self::Provider(_) => {
                ErrorCode::MarketDataError
            }
        }
    }
}

/// Invalid analysis or orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Errors building a stage prompt
#[derive(Debug, Error)]
pub enum PromptError {
    /// Template rendering failed
    #[error("Failed to render template '{name}': {detail}")]
    Render {
        /// Template name
        name: &'static str,
        /// Renderer message
        detail: String,
    },

    /// Prompt data could not be encoded as JSON
    #[error("Failed to encode prompt data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a reasoning-backed stage used its fallback
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// Prompt could not be built
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Provider call or response parsing failed
    #[error(transparent)]
    Llm(#[from] marketmind_llm::LLMError),
}

/// Errors from the analysis history store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the history file failed
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// History file is not valid JSON
    #[error("History format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StageError::recoverable(
            StageName::Technical,
            ErrorCode::TechAnalysisFallback,
            "reasoning call failed",
        );
        assert_eq!(
            err.to_string(),
            "technical stage failed with TECH_ANALYSIS_FALLBACK: reasoning call failed"
        );

        let err = MarketError::DataUnavailable {
            symbol: "AAPL".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for AAPL: No data found");
    }

    #[test]
    fn test_market_error_classification() {
        let missing = MarketError::MissingCredentials {
            provider: "alpha-vantage".to_string(),
        };
        assert!(!missing.is_recoverable());
        assert_eq!(missing.code(), ErrorCode::MissingCredentials);

        let limited = MarketError::RateLimited {
            provider: "alpha-vantage".to_string(),
        };
        assert!(limited.is_recoverable());
        assert!(!limited.is_transient());

        assert!(MarketError::Transient("502".to_string()).is_transient());
        assert_eq!(
            MarketError::SymbolNotFound("ZZZZ".to_string()).code(),
            ErrorCode::SymbolNotFound
        );
    }

    #[test]
    fn test_stage_error_serialization() {
        let err = StageError::fatal(StageName::MarketData, ErrorCode::SymbolNotFound, "no such ticker");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "SYMBOL_NOT_FOUND");
        assert_eq!(json["stage"], "marketData");
        assert_eq!(json["recoverable"], false);
    }
}
