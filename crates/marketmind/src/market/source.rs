//! Market data collaborator interface

use crate::error::MarketError;
use crate::market::{FundamentalsSnapshot, NewsHeadline, PriceSnapshot};
use async_trait::async_trait;

/// Source of quotes, fundamentals and news
///
/// Implementations classify their own failures: rate limiting, missing
/// credentials, unknown symbols and transient network errors each map to a
/// distinct [`MarketError`] variant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current quote plus daily price history
    async fn price(&self, symbol: &str) -> Result<PriceSnapshot, MarketError>;

    /// Fundamentals snapshot
    async fn fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, MarketError>;

    /// Headlines published within the last `days` days
    async fn news(&self, symbol: &str, days: u32) -> Result<Vec<NewsHeadline>, MarketError>;
}
