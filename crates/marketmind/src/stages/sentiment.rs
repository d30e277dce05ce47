//! News sentiment stage

use crate::config::AnalysisConfig;
use crate::error::{ErrorCode, StageError};
use crate::market::MarketDataPayload;
use crate::prompts;
use crate::stage::{Recommendation, Stage, StageContext, StageName, StageOutput, clamp_score};
use async_trait::async_trait;
use marketmind_llm::ReasoningClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Overall news tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    #[serde(alias = "Positive", alias = "POSITIVE")]
    Positive,
    #[serde(alias = "Negative", alias = "NEGATIVE")]
    Negative,
    #[serde(alias = "Neutral", alias = "NEUTRAL")]
    Neutral,
}

impl Sentiment {
    /// Vote cast by this sentiment when measuring consensus
    pub fn as_recommendation(&self) -> Recommendation {
        match self {
            Self::Positive => Recommendation::Buy,
            Self::Negative => Recommendation::Sell,
            Self::Neutral => Recommendation::Hold,
        }
    }
}

/// Crowd mood read from the headlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMood {
    #[serde(alias = "Fearful", alias = "FEARFUL")]
    Fearful,
    #[serde(alias = "Cautious", alias = "CAUTIOUS")]
    Cautious,
    #[serde(alias = "Neutral", alias = "NEUTRAL")]
    Neutral,
    #[serde(alias = "Optimistic", alias = "OPTIMISTIC")]
    Optimistic,
    #[serde(alias = "Greedy", alias = "GREEDY")]
    Greedy,
}

/// Sentiment stage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub overall_sentiment: Sentiment,
    pub sentiment_score: f64,
    #[serde(default)]
    pub key_themes: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub catalysts: Vec<String>,
    pub market_mood: MarketMood,
    #[serde(default)]
    pub news_count: usize,
    #[serde(default)]
    pub positive_count: usize,
    #[serde(default)]
    pub negative_count: usize,
    #[serde(default)]
    pub neutral_count: usize,
    #[serde(default)]
    pub reasoning: String,
    pub score: f64,
}

impl SentimentAnalysis {
    /// Neutral read used when reasoning is unavailable
    ///
    /// Counts split the headlines 30/20 positive/negative with the
    /// remainder neutral, so they always sum to `news_count`.
    pub fn fallback(news_count: usize) -> Self {
        let positive_count = news_count * 3 / 10;
        let negative_count = news_count * 2 / 10;
        Self {
            overall_sentiment: Sentiment::Neutral,
            sentiment_score: 5.0,
            key_themes: vec!["Insufficient sentiment data".to_string()],
            risks: vec!["Awaiting LLM insights".to_string()],
            catalysts: Vec::new(),
            market_mood: MarketMood::Neutral,
            news_count,
            positive_count,
            negative_count,
            neutral_count: news_count - positive_count - negative_count,
            reasoning: "Fallback heuristic used".to_string(),
            score: 5.0,
        }
    }

    fn clamped(mut self) -> Self {
        self.score = clamp_score(self.score);
        self.sentiment_score = clamp_score(self.sentiment_score);
        self
    }
}

/// Classifies recent headlines through the reasoning collaborator
pub struct SentimentStage {
    reasoning: Arc<ReasoningClient>,
    max_tokens: usize,
    max_headlines: usize,
    window_days: u32,
}

impl SentimentStage {
    /// Create the stage with headline limits from `config`
    pub fn new(reasoning: Arc<ReasoningClient>, config: &AnalysisConfig) -> Self {
        Self {
            reasoning,
            max_tokens: config.max_tokens.sentiment,
            max_headlines: config.max_headlines,
            window_days: config.news_window_days,
        }
    }
}

#[async_trait]
impl Stage for SentimentStage {
    type Input = MarketDataPayload;
    type Output = SentimentAnalysis;

    fn name(&self) -> StageName {
        StageName::Sentiment
    }

    async fn execute(
        &self,
        input: &MarketDataPayload,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<SentimentAnalysis>, StageError> {
        ctx.think("Reviewing latest news for sentiment signals");

        let reply = super::consult::<SentimentAnalysis>(
            &self.reasoning,
            ctx,
            prompts::SENTIMENT_ANALYST,
            prompts::sentiment_prompt(
                &input.symbol,
                &input.news,
                self.window_days,
                self.max_headlines,
            ),
            self.max_tokens,
        )
        .await;

        Ok(match reply {
            Ok(analysis) => StageOutput::primary(analysis.clamped()),
            Err(err) => {
                debug!(symbol = %input.symbol, "sentiment fallback: {err}");
                StageOutput::fallback(
                    SentimentAnalysis::fallback(input.news.len().min(self.max_headlines)),
                    StageError::recoverable(
                        StageName::Sentiment,
                        ErrorCode::SentimentFallback,
                        err.to_string(),
                    ),
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fixtures::{client, context, rising};
    use marketmind_llm::{ScriptedProvider, UsageLedger};

    #[test]
    fn test_fallback_counts_sum_to_total() {
        for n in [0, 1, 3, 7, 10, 19, 20] {
            let analysis = SentimentAnalysis::fallback(n);
            assert_eq!(
                analysis.positive_count + analysis.negative_count + analysis.neutral_count,
                n
            );
        }

        let analysis = SentimentAnalysis::fallback(10);
        assert_eq!(analysis.positive_count, 3);
        assert_eq!(analysis.negative_count, 2);
        assert_eq!(analysis.neutral_count, 5);
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
        assert_eq!(analysis.market_mood, MarketMood::Neutral);
    }

    #[test]
    fn test_sentiment_votes() {
        assert_eq!(Sentiment::Positive.as_recommendation(), Recommendation::Buy);
        assert_eq!(Sentiment::Negative.as_recommendation(), Recommendation::Sell);
        assert_eq!(Sentiment::Neutral.as_recommendation(), Recommendation::Hold);
    }

    #[tokio::test]
    async fn test_reasoning_reply_clamped() {
        let reply = r#"{"overallSentiment": "negative", "sentimentScore": -2,
            "marketMood": "fearful", "newsCount": 10, "negativeCount": 8,
            "score": 11}"#;
        let stage = SentimentStage::new(
            client(ScriptedProvider::new().route("financial news sentiment", reply)),
            &AnalysisConfig::default(),
        );
        let ledger = UsageLedger::new();
        let ctx = context(StageName::Sentiment, &[], &ledger);

        let output = stage.execute(&rising(3), &ctx).await.unwrap();
        assert!(!output.is_degraded());
        let analysis = output.payload;
        assert_eq!(analysis.overall_sentiment, Sentiment::Negative);
        assert!(analysis.sentiment_score.abs() < f64::EPSILON);
        assert!((analysis.score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_capitalized_labels_accepted() {
        let reply = r#"{"overallSentiment": "Positive", "sentimentScore": 7,
            "marketMood": "OPTIMISTIC", "score": 7}"#;
        let analysis: SentimentAnalysis = marketmind_llm::parse_json(reply).unwrap();
        assert_eq!(analysis.overall_sentiment, Sentiment::Positive);
        assert_eq!(analysis.market_mood, MarketMood::Optimistic);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_falls_back() {
        let stage = SentimentStage::new(
            client(ScriptedProvider::new().rate_limited_route("financial news sentiment")),
            &AnalysisConfig::builder().max_headlines(4).build().unwrap(),
        );
        let ledger = UsageLedger::new();
        let ctx = context(StageName::Sentiment, &[], &ledger);

        // fixture carries ten headlines
        let output = stage.execute(&rising(3), &ctx).await.unwrap();
        let error = output.degraded.unwrap();
        assert_eq!(error.code, ErrorCode::SentimentFallback);
        assert_eq!(output.payload.news_count, 4);
    }
}
