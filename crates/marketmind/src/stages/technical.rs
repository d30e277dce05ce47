//! Technical analysis stage

use crate::error::{ErrorCode, StageError};
use crate::indicators::{self, Bollinger, Macd};
use crate::market::{MarketDataPayload, PriceBar};
use crate::prompts;
use crate::stage::{
    Recommendation, Stage, StageContext, StageName, StageOutput, clamp_confidence, clamp_score,
};
use async_trait::async_trait;
use marketmind_llm::ReasoningClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_MULTIPLIER: f64 = 2.0;

/// Indicator values; each is absent when history is too short
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub bollinger_bands: Option<Bollinger>,
}

impl TechnicalIndicators {
    /// Compute every indicator from most-recent-first bars
    pub fn compute(bars: &[PriceBar]) -> Self {
        Self {
            rsi: indicators::rsi(bars, RSI_PERIOD),
            macd: indicators::macd(bars),
            sma20: indicators::sma(bars, 20),
            sma50: indicators::sma(bars, 50),
            sma200: indicators::sma(bars, 200),
            bollinger_bands: indicators::bollinger_bands(
                bars,
                BOLLINGER_PERIOD,
                BOLLINGER_MULTIPLIER,
            ),
        }
    }
}

/// Direction of the prevailing trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[serde(alias = "Bullish", alias = "BULLISH")]
    Bullish,
    #[serde(alias = "Bearish", alias = "BEARISH")]
    Bearish,
    #[serde(alias = "Neutral", alias = "NEUTRAL")]
    Neutral,
}

/// How pronounced the trend is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStrength {
    #[serde(alias = "Weak", alias = "WEAK")]
    Weak,
    #[serde(alias = "Moderate", alias = "MODERATE")]
    Moderate,
    #[serde(alias = "Strong", alias = "STRONG")]
    Strong,
}

/// Technical stage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAnalysis {
    /// Locally computed; never taken from the reasoning reply
    #[serde(default)]
    pub indicators: TechnicalIndicators,
    pub trend: Trend,
    pub trend_strength: TrendStrength,
    #[serde(default)]
    pub support: Vec<f64>,
    #[serde(default)]
    pub resistance: Vec<f64>,
    #[serde(default)]
    pub signals: Vec<String>,
    pub recommendation: Recommendation,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    pub score: f64,
}

impl TechnicalAnalysis {
    /// Moving-average heuristic used when reasoning is unavailable
    pub fn fallback(market: &MarketDataPayload, indicators: TechnicalIndicators) -> Self {
        let price = market.current_price;
        let above = indicators.sma50.is_some_and(|sma50| price > sma50);

        let (trend, recommendation, score, signal) = if above {
            (Trend::Bullish, Recommendation::Buy, 7.0, "Price trading above SMA50")
        } else {
            (Trend::Neutral, Recommendation::Hold, 5.0, "Price consolidating near SMA50")
        };

        Self {
            indicators,
            trend,
            trend_strength: TrendStrength::Moderate,
            support: vec![market.latest_close().unwrap_or(price)],
            resistance: vec![price * 1.05],
            signals: vec![signal.to_string()],
            recommendation,
            confidence: 0.6,
            reasoning: "Fallback heuristic based on moving averages".to_string(),
            score,
        }
    }

    fn clamped(mut self) -> Self {
        self.score = clamp_score(self.score);
        self.confidence = clamp_confidence(self.confidence);
        self
    }
}

/// Indicators plus a narrative trend read from the reasoning collaborator
pub struct TechnicalStage {
    reasoning: Arc<ReasoningClient>,
    max_tokens: usize,
}

impl TechnicalStage {
    /// Create the stage
    pub fn new(reasoning: Arc<ReasoningClient>, max_tokens: usize) -> Self {
        Self {
            reasoning,
            max_tokens,
        }
    }
}

#[async_trait]
impl Stage for TechnicalStage {
    type Input = MarketDataPayload;
    type Output = TechnicalAnalysis;

    fn name(&self) -> StageName {
        StageName::Technical
    }

    async fn execute(
        &self,
        input: &MarketDataPayload,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<TechnicalAnalysis>, StageError> {
        ctx.think("Crunching indicators for technical outlook");
        let indicators = TechnicalIndicators::compute(input.bars());

        let reply = super::consult::<TechnicalAnalysis>(
            &self.reasoning,
            ctx,
            prompts::TECHNICAL_ANALYST,
            prompts::technical_prompt(input, &indicators),
            self.max_tokens,
        )
        .await;

        Ok(match reply {
            Ok(analysis) => StageOutput::primary(
                TechnicalAnalysis {
                    indicators,
                    ..analysis
                }
                .clamped(),
            ),
            Err(err) => {
                debug!(symbol = %input.symbol, "technical fallback: {err}");
                StageOutput::fallback(
                    TechnicalAnalysis::fallback(input, indicators),
                    StageError::recoverable(
                        StageName::Technical,
                        ErrorCode::TechAnalysisFallback,
                        err.to_string(),
                    ),
                )
            }
        })
    }
}
