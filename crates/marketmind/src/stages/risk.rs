//! Risk stage
//!
//! Purely local: scores volatility, drawdown and prior-stage sentiment.

use crate::config::RiskWeights;
use crate::error::{ErrorCode, StageError};
use crate::indicators;
use crate::market::MarketDataPayload;
use crate::stage::{Stage, StageContext, StageName, StageOutput, clamp_score};
use crate::stages::{Sentiment, SentimentAnalysis, TechnicalAnalysis};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a 0-10 risk score
    pub fn from_score(score: f64) -> Self {
        if score > 7.0 {
            Self::High
        } else if score > 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Suggested allocation for this bucket
    pub fn position_size(&self) -> &'static str {
        match self {
            Self::High => "2% of portfolio",
            Self::Medium => "5% of portfolio",
            Self::Low => "8% of portfolio",
        }
    }
}

/// Risk stage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Annualized volatility as a fraction
    pub volatility: f64,
    pub beta: Option<f64>,
    /// Percent
    pub max_drawdown: f64,
    pub max_drawdown_estimate: String,
    pub recommended_position_size: String,
    pub stop_loss_level: f64,
    pub key_risks: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub reasoning: String,
    /// `10 - risk_score`
    pub score: f64,
}

impl RiskAnalysis {
    /// Fixed medium profile used when metrics cannot be computed
    pub fn fallback(market: &MarketDataPayload) -> Self {
        let level = RiskLevel::Medium;
        Self {
            risk_score: 5.0,
            risk_level: level,
            volatility: 0.0,
            beta: market.fundamentals.beta,
            max_drawdown: 0.0,
            max_drawdown_estimate: "n/a".to_string(),
            recommended_position_size: level.position_size().to_string(),
            stop_loss_level: market.current_price * 0.95,
            key_risks: vec!["Insufficient price history".to_string()],
            mitigation_strategies: vec![
                "Use a conservative position size".to_string(),
                "Use trailing stop-loss".to_string(),
            ],
            reasoning: "Fallback risk profile used".to_string(),
            score: 5.0,
        }
    }
}

/// Upstream results the risk stage reads
#[derive(Debug, Clone)]
pub struct RiskInput {
    pub market: Arc<MarketDataPayload>,
    pub technical: Arc<TechnicalAnalysis>,
    pub sentiment: Arc<SentimentAnalysis>,
}

/// Local risk scoring
pub struct RiskStage {
    weights: RiskWeights,
}

impl RiskStage {
    /// Create the stage with score coefficients
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    fn assess(&self, input: &RiskInput) -> Result<RiskAnalysis, StageError> {
        let market = &input.market;
        let bars = market.bars();
        if bars.len() < 2 {
            return Err(StageError::recoverable(
                StageName::Risk,
                ErrorCode::InsufficientData,
                format!("need at least 2 price bars, got {}", bars.len()),
            ));
        }

        let volatility = indicators::volatility(bars);
        let max_drawdown = indicators::max_drawdown(bars);
        if !volatility.is_finite() || !max_drawdown.is_finite() {
            return Err(StageError::recoverable(
                StageName::Risk,
                ErrorCode::RiskFallback,
                "risk metrics are not finite",
            ));
        }

        let penalty = if input.sentiment.overall_sentiment == Sentiment::Negative {
            self.weights.negative_sentiment_penalty
        } else {
            0.0
        };
        let risk_score = clamp_score(
            volatility * self.weights.volatility + max_drawdown * self.weights.drawdown + penalty,
        );
        let risk_level = RiskLevel::from_score(risk_score);

        let price = market.current_price;
        let stop_loss_level = input
            .technical
            .support
            .iter()
            .copied()
            .filter(|level| level.is_finite() && *level > 0.0 && *level <= price)
            .fold(None, |best: Option<f64>, level| {
                Some(best.map_or(level, |b| b.max(level)))
            })
            .unwrap_or(price * 0.9);

        let key_risks = vec![
            if risk_level == RiskLevel::High {
                "Elevated volatility".to_string()
            } else {
                "Moderate price swings".to_string()
            },
            "Market correlation risk".to_string(),
        ];

        Ok(RiskAnalysis {
            risk_score,
            risk_level,
            volatility,
            beta: market.fundamentals.beta,
            max_drawdown,
            max_drawdown_estimate: format!("{max_drawdown:.2}%"),
            recommended_position_size: risk_level.position_size().to_string(),
            stop_loss_level,
            key_risks,
            mitigation_strategies: vec![
                "Diversify across sectors".to_string(),
                "Use trailing stop-loss".to_string(),
            ],
            reasoning: "Risk quantified using realized volatility, drawdown and sentiment"
                .to_string(),
            score: 10.0 - risk_score,
        })
    }
}

#[async_trait]
impl Stage for RiskStage {
    type Input = RiskInput;
    type Output = RiskAnalysis;

    fn name(&self) -> StageName {
        StageName::Risk
    }

    async fn execute(
        &self,
        input: &RiskInput,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<RiskAnalysis>, StageError> {
        ctx.think("Evaluating volatility, drawdowns, and concentration risk");

        Ok(match self.assess(input) {
            Ok(analysis) => StageOutput::primary(analysis),
            Err(err) => StageOutput::fallback(RiskAnalysis::fallback(&input.market), err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fixtures::{context, market, rising};
    use marketmind_llm::UsageLedger;

    fn input(market: MarketDataPayload, support: Vec<f64>, sentiment: Sentiment) -> RiskInput {
        let market = Arc::new(market);
        let mut technical = TechnicalAnalysis::fallback(&market, Default::default());
        technical.support = support;
        let mut analysis = SentimentAnalysis::fallback(0);
        analysis.overall_sentiment = sentiment;
        RiskInput {
            market,
            technical: Arc::new(technical),
            sentiment: Arc::new(analysis),
        }
    }

    async fn run(stage: &RiskStage, input: &RiskInput) -> StageOutput<RiskAnalysis> {
        let ledger = UsageLedger::new();
        let ctx = context(StageName::Risk, &[], &ledger);
        stage.execute(input, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_insufficient_history_falls_back() {
        let stage = RiskStage::new(RiskWeights::default());
        let input = input(market(&[100.0], 100.0), vec![], Sentiment::Neutral);

        let output = run(&stage, &input).await;
        let error = output.degraded.unwrap();
        assert_eq!(error.code, ErrorCode::InsufficientData);
        assert!(error.recoverable);

        let risk = output.payload;
        assert!((risk.risk_score - 5.0).abs() < f64::EPSILON);
        assert_eq!(risk.risk_level, RiskLevel::Medium);
        assert!((risk.stop_loss_level - 95.0).abs() < 1e-9);
        assert!((risk.score - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_formula_and_bounds() {
        let stage = RiskStage::new(RiskWeights::default());
        let input = input(
            market(&[100.0, 120.0, 90.0, 110.0, 60.0, 80.0], 80.0),
            vec![],
            Sentiment::Neutral,
        );

        let risk = run(&stage, &input).await.payload;
        // 50% drawdown alone saturates the score
        assert!((risk.max_drawdown - 50.0).abs() < 1e-9);
        assert!((risk.risk_score - 10.0).abs() < f64::EPSILON);
        assert_eq!(risk.risk_level, RiskLevel::High);
        assert_eq!(risk.recommended_position_size, "2% of portfolio");
        assert_eq!(risk.max_drawdown_estimate, "50.00%");
        assert!(risk.score.abs() < f64::EPSILON);
        assert_eq!(risk.beta, Some(1.2));
    }

    #[tokio::test]
    async fn test_calm_uptrend_is_low_risk() {
        let stage = RiskStage::new(RiskWeights::default());
        let input = input(rising(30), vec![], Sentiment::Neutral);

        let risk = run(&stage, &input).await.payload;
        assert!(risk.max_drawdown.abs() < f64::EPSILON);
        assert!(risk.risk_score < 4.0);
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(risk.recommended_position_size, "8% of portfolio");
        assert!((risk.score - (10.0 - risk.risk_score)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_negative_sentiment_adds_penalty() {
        let stage = RiskStage::new(RiskWeights::default());
        let calm = run(&stage, &input(rising(30), vec![], Sentiment::Neutral)).await;
        let gloomy = run(&stage, &input(rising(30), vec![], Sentiment::Negative)).await;
        let delta = gloomy.payload.risk_score - calm.payload.risk_score;
        assert!((delta - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stop_loss_uses_nearest_support_below_price() {
        let stage = RiskStage::new(RiskWeights::default());
        // price 129
        let risk = run(
            &stage,
            &input(rising(30), vec![110.0, 125.0, 140.0, -1.0], Sentiment::Neutral),
        )
        .await
        .payload;
        assert!((risk.stop_loss_level - 125.0).abs() < f64::EPSILON);

        let risk = run(&stage, &input(rising(30), vec![150.0], Sentiment::Neutral))
            .await
            .payload;
        assert!((risk.stop_loss_level - 129.0 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(7.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(7.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Low);
    }
}
