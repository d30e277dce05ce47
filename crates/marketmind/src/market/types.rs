//! Market data types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading day
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Day high
    pub high: f64,
    /// Day low
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Shares traded
    pub volume: u64,
}

impl PriceBar {
    /// Bar with open/high/low equal to the close
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Company fundamentals; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_per_share: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
}

/// Sentiment tag a news provider may attach to a headline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineSentiment {
    Positive,
    Neutral,
    Negative,
}

/// A news headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsHeadline {
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<HeadlineSentiment>,
}

/// Quote and price history returned by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub current_price: f64,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub price_change: Option<f64>,
    #[serde(default)]
    pub price_change_percent: Option<f64>,
    /// Bars in whatever order the provider uses
    pub historical_prices: Vec<PriceBar>,
}

/// Shared input of every analysis stage
///
/// Bars are normalized to most-recent-first on construction, which is the
/// order indicator functions expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataPayload {
    pub symbol: String,
    pub current_price: f64,
    pub previous_close: Option<f64>,
    pub price_change: Option<f64>,
    pub price_change_percent: Option<f64>,
    historical_prices: Vec<PriceBar>,
    pub fundamentals: FundamentalsSnapshot,
    pub news: Vec<NewsHeadline>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketDataPayload {
    /// Assemble a payload, normalizing bar order
    pub fn new(
        symbol: impl Into<String>,
        price: PriceSnapshot,
        fundamentals: FundamentalsSnapshot,
        news: Vec<NewsHeadline>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut bars = price.historical_prices;
        bars.sort_by(|a, b| b.date.cmp(&a.date));

        let price_change = price.price_change.or_else(|| {
            price
                .previous_close
                .map(|prev| price.current_price - prev)
        });
        let price_change_percent = price.price_change_percent.or_else(|| {
            match (price_change, price.previous_close) {
                (Some(change), Some(prev)) if prev.abs() > f64::EPSILON => {
                    Some(change / prev * 100.0)
                }
                _ => None,
            }
        });

        Self {
            symbol: symbol.into(),
            current_price: price.current_price,
            previous_close: price.previous_close,
            price_change,
            price_change_percent,
            historical_prices: bars,
            fundamentals,
            news,
            fetched_at,
        }
    }

    /// Bars, most recent first
    pub fn bars(&self) -> &[PriceBar] {
        &self.historical_prices
    }

    /// Close of the most recent bar
    pub fn latest_close(&self) -> Option<f64> {
        self.historical_prices.first().map(|bar| bar.close)
    }
}
