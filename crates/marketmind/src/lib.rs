//! Stock analysis orchestrator
//!
//! This crate turns a ticker symbol into a buy/hold/sell report by running a
//! fixed pipeline of stages. It includes:
//!
//! - Market data collection with retries and TTL caching
//! - Technical indicators (SMA, RSI, MACD, Bollinger Bands, volatility, drawdown)
//! - Technical, fundamental and sentiment stages backed by a reasoning
//!   collaborator, each with a deterministic fallback
//! - Local risk scoring
//! - A report stage synthesizing every upstream result
//! - Progress and error events for observers, and JSON history persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use marketmind::{Orchestrator, SyntheticMarketData, TracingObserver};
//! use marketmind_llm::{OpenAIProvider, ReasoningClient, ReasoningConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let reasoning = Arc::new(ReasoningClient::new(provider, ReasoningConfig::from_env()));
//!
//!     let orchestrator = Orchestrator::builder()
//!         .source(Arc::new(SyntheticMarketData::new()))
//!         .reasoning(reasoning)
//!         .observer(Arc::new(TracingObserver))
//!         .build()?;
//!
//!     let record = orchestrator.run("AAPL").await?;
//!     println!("{} {}", record.symbol, record.final_recommendation);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod indicators;
pub mod market;
pub mod observer;
pub mod orchestrator;
pub mod prompts;
pub mod stage;
pub mod stages;
pub mod store;

pub use config::{AnalysisConfig, AnalysisConfigBuilder, RiskWeights, TokenBudget};
pub use error::{
    ConfigError, ErrorCode, MarketError, PromptError, ReasoningError, StageError, StoreError,
};
pub use market::{
    CachedMarketData, FundamentalsSnapshot, MarketDataPayload, MarketDataSource, NewsHeadline,
    PriceBar, PriceSnapshot, SyntheticMarketData,
};
pub use observer::{AnalysisObserver, TracingObserver};
pub use orchestrator::{
    AgentScores, AnalysisPhase, AnalysisRecord, AnalysisResults, AnalysisState, Orchestrator,
    OrchestratorBuilder,
};
pub use stage::{Recommendation, Stage, StageContext, StageName, StageOutput, StageStatus};
pub use store::{AnalysisSink, JsonHistoryStore};
