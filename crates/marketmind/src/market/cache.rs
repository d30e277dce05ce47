//! TTL caching for market data sources

use crate::error::MarketError;
use crate::market::{FundamentalsSnapshot, MarketDataSource, NewsHeadline, PriceSnapshot};
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Thread-safe cache with a fixed entry lifespan
pub struct TtlCache<K, V> {
    cache: Arc<RwLock<TimedCache<K, V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: K, value: V) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("Cache hit for key: {:?}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for key: {:?}", key);
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Market data source decorator that caches each endpoint separately
pub struct CachedMarketData<S> {
    inner: S,
    prices: TtlCache<String, PriceSnapshot>,
    fundamentals: TtlCache<String, FundamentalsSnapshot>,
    news: TtlCache<String, Vec<NewsHeadline>>,
}

impl<S: MarketDataSource> CachedMarketData<S> {
    /// Wrap a source with the given TTLs
    pub fn new(
        inner: S,
        price_ttl: Duration,
        fundamentals_ttl: Duration,
        news_ttl: Duration,
    ) -> Self {
        Self {
            inner,
            prices: TtlCache::new(price_ttl),
            fundamentals: TtlCache::new(fundamentals_ttl),
            news: TtlCache::new(news_ttl),
        }
    }

    /// Wrap a source using the TTLs of an analysis configuration
    pub fn from_config(inner: S, config: &crate::config::AnalysisConfig) -> Self {
        Self::new(
            inner,
            config.cache_ttl_price,
            config.cache_ttl_fundamentals,
            config.cache_ttl_news,
        )
    }
}

#[async_trait]
impl<S: MarketDataSource> MarketDataSource for CachedMarketData<S> {
    async fn price(&self, symbol: &str) -> Result<PriceSnapshot, MarketError> {
        self.prices
            .get_or_fetch(symbol.to_uppercase(), || self.inner.price(symbol))
            .await
    }

    async fn fundamentals(&self, symbol: &str) -> Result<FundamentalsSnapshot, MarketError> {
        self.fundamentals
            .get_or_fetch(symbol.to_uppercase(), || self.inner.fundamentals(symbol))
            .await
    }

    async fn news(&self, symbol: &str, days: u32) -> Result<Vec<NewsHeadline>, MarketError> {
        let key = format!("{}-{days}", symbol.to_uppercase());
        self.news
            .get_or_fetch(key, || self.inner.news(symbol, days))
            .await
    }
}
