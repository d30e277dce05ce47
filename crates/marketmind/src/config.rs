//! Configuration for analysis runs

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coefficients of the risk score
///
/// `risk = volatility * volatility_weight + drawdown_pct * drawdown_weight
/// + penalty (when sentiment is negative)`, clamped to 0-10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Multiplier on annualized volatility (a fraction, e.g. 0.3)
    pub volatility: f64,
    /// Multiplier on max drawdown in percent
    pub drawdown: f64,
    /// Added when prior-stage sentiment is negative
    pub negative_sentiment_penalty: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            volatility: 10.0,
            drawdown: 0.5,
            negative_sentiment_penalty: 1.0,
        }
    }
}

impl RiskWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            self.volatility,
            self.drawdown,
            self.negative_sentiment_penalty,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError(
                "risk weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completion token limits per reasoning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Technical stage
    pub technical: usize,
    /// Fundamental stage
    pub fundamental: usize,
    /// Sentiment stage
    pub sentiment: usize,
    /// Report stage
    pub report: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            technical: 500,
            fundamental: 500,
            sentiment: 400,
            report: 600,
        }
    }
}

/// Configuration for analysis runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Days of news requested from the source
    pub news_window_days: u32,

    /// Headlines forwarded to the sentiment stage
    pub max_headlines: usize,

    /// Retries for transient market data failures
    pub max_retries: u32,

    /// Initial backoff for market data retries
    pub retry_backoff_base: Duration,

    /// Cache TTL for price history
    pub cache_ttl_price: Duration,

    /// Cache TTL for fundamentals
    pub cache_ttl_fundamentals: Duration,

    /// Cache TTL for news
    pub cache_ttl_news: Duration,

    /// Risk score coefficients
    pub risk_weights: RiskWeights,

    /// Completion limits per stage
    pub max_tokens: TokenBudget,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            news_window_days: 7,
            max_headlines: 20,
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(500),
            cache_ttl_price: Duration::from_secs(120),          // 2 minutes
            cache_ttl_fundamentals: Duration::from_secs(3600),  // 1 hour
            cache_ttl_news: Duration::from_secs(300),           // 5 minutes
            risk_weights: RiskWeights::default(),
            max_tokens: TokenBudget::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.news_window_days == 0 {
            return Err(ConfigError(
                "news_window_days must be greater than 0".to_string(),
            ));
        }

        if self.max_headlines == 0 {
            return Err(ConfigError("max_headlines must be greater than 0".to_string()));
        }

        let budget = self.max_tokens;
        if [budget.technical, budget.fundamental, budget.sentiment, budget.report].contains(&0) {
            return Err(ConfigError("token budgets must be greater than 0".to_string()));
        }

        self.risk_weights.validate()
    }

    /// Get retry backoff duration for attempt number (0-based)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base * 2_u32.saturating_pow(attempt)
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    news_window_days: Option<u32>,
    max_headlines: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    cache_ttl_price: Option<Duration>,
    cache_ttl_fundamentals: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    risk_weights: Option<RiskWeights>,
    max_tokens: Option<TokenBudget>,
}

impl AnalysisConfigBuilder {
    /// Set the news window in days
    pub fn news_window_days(mut self, days: u32) -> Self {
        self.news_window_days = Some(days);
        self
    }

    /// Set the headline limit for sentiment analysis
    pub fn max_headlines(mut self, limit: usize) -> Self {
        self.max_headlines = Some(limit);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set cache TTL for price history
    pub fn cache_ttl_price(mut self, duration: Duration) -> Self {
        self.cache_ttl_price = Some(duration);
        self
    }

    /// Set cache TTL for fundamentals
    pub fn cache_ttl_fundamentals(mut self, duration: Duration) -> Self {
        self.cache_ttl_fundamentals = Some(duration);
        self
    }

    /// Set cache TTL for news
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set risk score coefficients
    pub fn risk_weights(mut self, weights: RiskWeights) -> Self {
        self.risk_weights = Some(weights);
        self
    }

    /// Set per-stage token limits
    pub fn max_tokens(mut self, budget: TokenBudget) -> Self {
        self.max_tokens = Some(budget);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let defaults = AnalysisConfig::default();

        let config = AnalysisConfig {
            news_window_days: self.news_window_days.unwrap_or(defaults.news_window_days),
            max_headlines: self.max_headlines.unwrap_or(defaults.max_headlines),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            cache_ttl_price: self.cache_ttl_price.unwrap_or(defaults.cache_ttl_price),
            cache_ttl_fundamentals: self
                .cache_ttl_fundamentals
                .unwrap_or(defaults.cache_ttl_fundamentals),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            risk_weights: self.risk_weights.unwrap_or(defaults.risk_weights),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        };

        config.validate()?;
        Ok(config)
    }
}
