//! Market data stage

use crate::config::AnalysisConfig;
use crate::error::{ErrorCode, MarketError, StageError};
use crate::market::{MarketDataPayload, MarketDataSource};
use crate::stage::{Stage, StageContext, StageName, StageOutput};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_SYMBOL_LEN: usize = 10;

/// Trim and upper-case a ticker, rejecting anything outside `A-Z 0-9 . -`
pub fn normalize_symbol(raw: &str) -> Result<String, StageError> {
    let symbol = raw.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-');

    if valid {
        Ok(symbol)
    } else {
        Err(StageError::recoverable(
            StageName::MarketData,
            ErrorCode::InvalidSymbol,
            format!("Invalid symbol: {raw:?}"),
        ))
    }
}

/// Fetches price history, fundamentals and news in parallel
pub struct MarketDataStage {
    source: Arc<dyn MarketDataSource>,
    config: AnalysisConfig,
}

impl MarketDataStage {
    /// Create the stage over a source
    pub fn new(source: Arc<dyn MarketDataSource>, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    /// Run `fetch`, retrying transient failures with exponential backoff
    async fn with_retry<T, F, Fut>(
        &self,
        what: &'static str,
        symbol: &str,
        fetch: F,
    ) -> Result<T, MarketError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff(attempt);
                    attempt += 1;
                    warn!(
                        symbol,
                        fetch = what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient market data failure, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch(&self, symbol: &str) -> Result<MarketDataPayload, MarketError> {
        let days = self.config.news_window_days;
        let (price, fundamentals, news) = tokio::try_join!(
            self.with_retry("price", symbol, || self.source.price(symbol)),
            self.with_retry("fundamentals", symbol, || self.source.fundamentals(symbol)),
            self.with_retry("news", symbol, || self.source.news(symbol, days)),
        )?;

        if !price.current_price.is_finite() || price.current_price <= 0.0 {
            return Err(MarketError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("invalid current price {}", price.current_price),
            });
        }

        debug!(
            symbol,
            bars = price.historical_prices.len(),
            headlines = news.len(),
            "market data fetched"
        );
        Ok(MarketDataPayload::new(
            symbol,
            price,
            fundamentals,
            news,
            Utc::now(),
        ))
    }
}

#[async_trait]
impl Stage for MarketDataStage {
    type Input = str;
    type Output = MarketDataPayload;

    fn name(&self) -> StageName {
        StageName::MarketData
    }

    async fn execute(
        &self,
        input: &str,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<MarketDataPayload>, StageError> {
        let symbol = normalize_symbol(input)?;
        ctx.think(format!(
            "Collecting price, fundamentals, and news for {symbol}"
        ));

        self.fetch(&symbol)
            .await
            .map(StageOutput::primary)
            .map_err(|err| {
                StageError::new(
                    StageName::MarketData,
                    err.code(),
                    err.to_string(),
                    err.is_recoverable(),
                )
            })
    }
}
