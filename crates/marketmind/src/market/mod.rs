//! Market data model and sources

mod cache;
mod source;
mod synthetic;
mod types;

pub use cache::{CachedMarketData, TtlCache};
#[cfg(test)]
pub use source::MockMarketDataSource;
pub use source::MarketDataSource;
pub use synthetic::SyntheticMarketData;
pub use types::{
    FundamentalsSnapshot, HeadlineSentiment, MarketDataPayload, NewsHeadline, PriceBar,
    PriceSnapshot,
};
