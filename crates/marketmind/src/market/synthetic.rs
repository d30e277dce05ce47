//! Deterministic market data for offline runs
//!
//! Every value is derived from a seed computed from the symbol's characters,
//! so the same symbol always yields the same quote, history and headlines.

use crate::error::MarketError;
use crate::market::{
    FundamentalsSnapshot, MarketDataSource, NewsHeadline, PriceBar, PriceSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::time::Duration;

const HISTORY_DAYS: u32 = 30;

/// Synthetic market data seeded by the symbol
#[derive(Debug, Clone, Default)]
pub struct SyntheticMarketData {
    anchor: Option<DateTime<Utc>>,
    latency: Duration,
}

impl SyntheticMarketData {
    /// Source anchored at the current time
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the most recent bar and headline times
    pub fn with_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Sleep before answering each request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.anchor.unwrap_or_else(Utc::now)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn seed(symbol: &str) -> u32 {
    symbol.chars().map(u32::from).sum()
}

fn validate(symbol: &str) -> Result<(), MarketError> {
    if symbol.trim().is_empty() {
        return Err(MarketError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

fn history(seed: u32, base: f64, today: NaiveDate) -> Vec<PriceBar> {
    (0..HISTORY_DAYS)
        .filter_map(|i| {
            let date = today.checked_sub_days(Days::new(u64::from(i)))?;
            let swing = (f64::from(i) + f64::from(seed)).sin() * 5.0;
            let close = base + swing - f64::from(i) * 0.5;
            let open = close - swing * 0.2;
            let volume = 1_000_000
                + u64::from(seed) * 1000
                + u64::from((seed * 37 + i * 9973) % 500_000);
            Some(PriceBar {
                date,
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume,
            })
        })
        .rev()
        .collect()
}

#[async_trait]
impl MarketDataSource for SyntheticMarketData {
    async fn price(&self, symbol: &str) -> Result<PriceSnapshot, MarketError> {
        validate(symbol)?;
        self.simulate_latency().await;

        let seed = seed(symbol);
        let base = 100.0 + f64::from(seed % 200);
        let change = f64::from(seed % 10) - 5.0;

        Ok(PriceSnapshot {
            current_price: base,
            previous_close: Some(base - change),
            price_change: Some(change),
            price_change_percent: Some(change / base * 100.0),
            historical_prices: history(seed, base, self.now().date_naive()),
        })
    }

    async fn fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, MarketError> {
        validate(symbol)?;
        self.simulate_latency().await;

        Ok(FundamentalsSnapshot {
            market_cap: Some(2.5e12),
            pe_ratio: Some(28.5),
            eps: Some(6.4),
            pb_ratio: Some(45.2),
            dividend_yield: Some(0.5),
            revenue_per_share: Some(25.1),
            profit_margin: Some(0.25),
            sector: Some("Technology".to_string()),
            industry: Some("Consumer Electronics".to_string()),
            roe: Some(1.5),
            debt_to_equity: Some(1.8),
            beta: Some(1.2),
        })
    }

    async fn news(&self, symbol: &str, days: u32) -> Result<Vec<NewsHeadline>, MarketError> {
        validate(symbol)?;
        self.simulate_latency().await;

        let now = self.now();
        let stories = [
            (format!("{symbol} Reports Strong Quarterly Earnings"), "Mock Financial News"),
            (format!("Analysts Upgrade {symbol} to Buy"), "Market Watcher"),
            (format!("New Product Launch Expected from {symbol}"), "Tech Daily"),
        ];

        Ok(stories
            .into_iter()
            .enumerate()
            .filter(|(age, _)| *age < days.max(1) as usize)
            .map(|(age, (title, source))| NewsHeadline {
                url: format!("https://example.com/news/{}/{age}", symbol.to_lowercase()),
                title,
                source: source.to_string(),
                published_at: now.checked_sub_days(Days::new(age as u64)).unwrap_or(now),
                sentiment: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source() -> SyntheticMarketData {
        SyntheticMarketData::new().with_anchor(Utc.with_ymd_and_hms(2024, 6, 28, 16, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_price_is_deterministic() {
        let a = source().price("AAPL").await.unwrap();
        let b = source().price("AAPL").await.unwrap();
        assert_eq!(a, b);

        // "AAPL" = 65 + 65 + 80 + 76
        assert!((a.current_price - (100.0 + f64::from(286 % 200))).abs() < 1e-9);
        assert_eq!(a.historical_prices.len(), 30);
        // chronological: oldest first
        assert!(a.historical_prices[0].date < a.historical_prices[29].date);
    }

    #[tokio::test]
    async fn test_fundamentals_and_news() {
        let fundamentals = source().fundamentals("MSFT").await.unwrap();
        assert_eq!(fundamentals.pe_ratio, Some(28.5));
        assert_eq!(fundamentals.sector.as_deref(), Some("Technology"));

        let news = source().news("MSFT", 7).await.unwrap();
        assert_eq!(news.len(), 3);
        assert_eq!(news[1].title, "Analysts Upgrade MSFT to Buy");
    }

    #[tokio::test]
    async fn test_blank_symbol_rejected() {
        let err = source().price("  ").await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidSymbol(_)));
    }
}
