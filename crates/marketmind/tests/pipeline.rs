//! End-to-end runs through the public API

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use marketmind::{
    AnalysisConfig, AnalysisPhase, AnalysisRecord, AnalysisSink, CachedMarketData, ErrorCode,
    FundamentalsSnapshot, JsonHistoryStore, MarketDataSource, MarketError, NewsHeadline,
    Orchestrator, PriceBar, PriceSnapshot, Recommendation, StageName, StoreError,
    SyntheticMarketData,
};
use marketmind_llm::{QueueConfig, ReasoningClient, ReasoningConfig, ScriptedProvider};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Thirty rising daily closes, cheap fundamentals, five headlines
struct TrendingSource {
    price_calls: AtomicUsize,
}

impl TrendingSource {
    fn new() -> Self {
        Self {
            price_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketDataSource for TrendingSource {
    async fn price(&self, _symbol: &str) -> Result<PriceSnapshot, MarketError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let historical_prices = (0..30u64)
            .map(|i| {
                let date = start.checked_add_days(Days::new(i)).unwrap();
                PriceBar::flat(date, 100.0 + i as f64)
            })
            .collect();
        Ok(PriceSnapshot {
            current_price: 129.0,
            previous_close: Some(128.0),
            price_change: None,
            price_change_percent: None,
            historical_prices,
        })
    }

    async fn fundamentals(&self, _symbol: &str) -> Result<FundamentalsSnapshot, MarketError> {
        Ok(FundamentalsSnapshot {
            pe_ratio: Some(12.0),
            beta: Some(0.9),
            ..FundamentalsSnapshot::default()
        })
    }

    async fn news(&self, symbol: &str, _days: u32) -> Result<Vec<NewsHeadline>, MarketError> {
        Ok((0..5)
            .map(|i| NewsHeadline {
                title: format!("{symbol} headline {i}"),
                source: "Wire".to_string(),
                published_at: Utc::now(),
                url: format!("https://example.com/{i}"),
                sentiment: None,
            })
            .collect())
    }
}

struct FailingSink;

#[async_trait]
impl AnalysisSink for FailingSink {
    async fn save(&self, _record: &AnalysisRecord) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }
}

fn client(provider: ScriptedProvider) -> Arc<ReasoningClient> {
    Arc::new(ReasoningClient::new(
        Arc::new(provider),
        ReasoningConfig::default().with_queue(QueueConfig::unthrottled()),
    ))
}

fn scripted() -> ScriptedProvider {
    ScriptedProvider::new()
        .route(
            "technical analysis expert",
            r#"{"trend": "bullish", "trendStrength": "strong", "signals": ["Higher highs"],
                "support": [120.0], "resistance": [135.0], "recommendation": "BUY",
                "confidence": 0.8, "reasoning": "Clean uptrend", "score": 8}"#,
        )
        .route(
            "CFA charterholder",
            r#"```json
{"valuation": "cheap", "growthPotential": "high", "recommendation": "BUY",
 "confidence": 0.7, "reasoning": "Low multiple", "score": 7.5}
```"#,
        )
        .route(
            "financial news sentiment",
            r#"{"overallSentiment": "positive", "sentimentScore": 7, "marketMood": "optimistic",
                "newsCount": 5, "positiveCount": 4, "negativeCount": 0, "neutralCount": 1,
                "score": 7}"#,
        )
        .route(
            "synthesize findings",
            r#"{"finalRecommendation": "BUY", "overallConfidence": 0.75, "compositeScore": 7.9,
                "executiveSummary": "Constructive setup",
                "agentConsensus": {"agreement": "high", "conflictingAgents": [], "consensus": "BUY"},
                "keyInsights": ["Trend intact"], "actionItems": ["Scale in"], "fullReport": "report"}"#,
        )
}

#[tokio::test]
async fn scripted_run_takes_primary_paths_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonHistoryStore::new(dir.path().join("history.json")));

    let orchestrator = Orchestrator::builder()
        .source(Arc::new(TrendingSource::new()))
        .reasoning(client(scripted()))
        .sink(Arc::clone(&store) as Arc<dyn AnalysisSink>)
        .build()
        .unwrap();

    let record = orchestrator.run("acme").await.unwrap();
    assert_eq!(record.symbol, "ACME");
    assert!(record.errors.is_empty(), "{:?}", record.errors);
    assert_eq!(record.final_recommendation, Recommendation::Buy);
    assert!((record.composite_score - 7.9).abs() < f64::EPSILON);
    assert!((record.agent_scores.technical - 8.0).abs() < f64::EPSILON);
    assert_eq!(record.usage.requests, 4);
    assert!(record.usage.total_tokens() > 0);

    let technical = record.full_data.technical.as_ref().unwrap();
    assert!(technical.indicators.rsi.is_some());
    assert!(technical.indicators.sma20.is_some());
    assert!(technical.indicators.macd.is_none());

    let risk = record.full_data.risk.as_ref().unwrap();
    // nearest support below 129
    assert!((risk.stop_loss_level - 120.0).abs() < f64::EPSILON);
    assert_eq!(risk.beta, Some(0.9));

    let saved = store.load().await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, record.id);
    assert_eq!(saved[0], record);
}

#[tokio::test]
async fn failing_reasoning_still_produces_a_report() {
    let orchestrator = Orchestrator::builder()
        .source(Arc::new(TrendingSource::new()))
        .reasoning(client(ScriptedProvider::new()))
        .sink(Arc::new(FailingSink))
        .build()
        .unwrap();

    let record = orchestrator.run("ACME").await.unwrap();

    let stages: Vec<StageName> = record.errors.iter().map(|e| e.stage).collect();
    assert_eq!(stages.len(), 4);
    for stage in [
        StageName::Technical,
        StageName::Fundamental,
        StageName::Sentiment,
        StageName::Report,
    ] {
        assert!(stages.contains(&stage), "missing fallback for {stage}");
    }

    let scores = record.agent_scores;
    // no SMA50 with 30 bars: HOLD at 5; P/E 12 is cheap: 7; neutral sentiment: 5
    assert!((scores.technical - 5.0).abs() < f64::EPSILON);
    assert!((scores.fundamental - 7.0).abs() < f64::EPSILON);
    assert!((scores.sentiment - 5.0).abs() < f64::EPSILON);
    assert!(scores.risk > 9.0);

    let mean = (scores.technical + scores.fundamental + scores.sentiment + scores.risk) / 4.0;
    assert!((record.composite_score - mean).abs() < 1e-12);
    assert_eq!(record.final_recommendation, Recommendation::from_composite(mean));
    assert_eq!(record.final_recommendation, Recommendation::Buy);

    let report = record.full_data.report.as_ref().unwrap();
    assert!(!report.full_report.is_empty());
    assert!(report.full_report.contains("ACME"));

    let sentiment = record.full_data.sentiment.as_ref().unwrap();
    assert_eq!(sentiment.news_count, 5);
    assert_eq!(sentiment.positive_count, 1);
    assert_eq!(sentiment.negative_count, 1);
    assert_eq!(sentiment.neutral_count, 3);
}

#[tokio::test]
async fn invalid_symbol_fails_before_any_fetch() {
    let source = Arc::new(TrendingSource::new());
    let orchestrator = Orchestrator::builder()
        .source(Arc::clone(&source) as Arc<dyn MarketDataSource>)
        .reasoning(client(scripted()))
        .build()
        .unwrap();

    let err = orchestrator.run("NOT A TICKER").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSymbol);
    assert_eq!(source.price_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_source_serves_repeat_runs() {
    let config = AnalysisConfig::builder()
        .cache_ttl_price(Duration::from_secs(60))
        .build()
        .unwrap();
    let cached = Arc::new(CachedMarketData::from_config(
        SyntheticMarketData::new(),
        &config,
    ));

    let orchestrator = Orchestrator::builder()
        .source(cached)
        .reasoning(client(ScriptedProvider::new()))
        .config(config)
        .build()
        .unwrap();

    let first = orchestrator.run("AAPL").await.unwrap();
    let second = orchestrator.run("AAPL").await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(
        first.full_data.market_data.as_ref().unwrap().bars(),
        second.full_data.market_data.as_ref().unwrap().bars()
    );
}

#[test]
fn phases_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&AnalysisPhase::Completed).unwrap(),
        "\"completed\""
    );
}
