//! Fundamental analysis stage

use crate::error::{ErrorCode, StageError};
use crate::market::{FundamentalsSnapshot, MarketDataPayload};
use crate::prompts;
use crate::stage::{
    Recommendation, Stage, StageContext, StageName, StageOutput, clamp_confidence, clamp_score,
};
use async_trait::async_trait;
use marketmind_llm::ReasoningClient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// Sector-average P/E used by the fallback
const SECTOR_AVERAGE_PE: f64 = 20.0;

/// Growth outlook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthPotential {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

/// Fundamental stage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalAnalysis {
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub sector_comparison: Map<String, Value>,
    /// Free text, typically cheap, fairly valued or expensive
    pub valuation: String,
    pub growth_potential: GrowthPotential,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    pub recommendation: Recommendation,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    pub score: f64,
}

impl FundamentalAnalysis {
    /// P/E heuristic used when reasoning is unavailable
    ///
    /// A missing or non-positive P/E is treated as fairly valued.
    pub fn fallback(fundamentals: &FundamentalsSnapshot) -> Self {
        let pe = fundamentals.pe_ratio.filter(|pe| pe.is_finite() && *pe > 0.0);

        let valuation = match pe {
            Some(pe) if pe < 15.0 => "cheap",
            Some(pe) if pe >= 30.0 => "expensive",
            _ => "fairly valued",
        };
        let pe_relative = match pe {
            None => "n/a",
            Some(pe) if pe < SECTOR_AVERAGE_PE => "below sector average",
            Some(_) => "above sector average",
        };

        let mut sector_comparison = Map::new();
        sector_comparison.insert("peSectorAvg".to_string(), json!(SECTOR_AVERAGE_PE));
        sector_comparison.insert("peRelative".to_string(), json!(pe_relative));

        let metrics = match serde_json::to_value(fundamentals) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let cheap = valuation == "cheap";
        Self {
            metrics,
            sector_comparison,
            valuation: valuation.to_string(),
            growth_potential: if fundamentals.revenue_per_share.is_some_and(|r| r > 0.0) {
                GrowthPotential::High
            } else {
                GrowthPotential::Medium
            },
            strengths: vec!["Automated fallback insights".to_string()],
            weaknesses: vec!["LLM unavailable".to_string()],
            recommendation: if cheap {
                Recommendation::Buy
            } else {
                Recommendation::Hold
            },
            confidence: 0.55,
            reasoning: "Fallback heuristic using P/E relative to sector average".to_string(),
            score: if cheap { 7.0 } else { 6.0 },
        }
    }

    fn clamped(mut self) -> Self {
        self.score = clamp_score(self.score);
        self.confidence = clamp_confidence(self.confidence);
        self
    }
}

/// Valuation and growth assessment from the fundamentals snapshot
pub struct FundamentalStage {
    reasoning: Arc<ReasoningClient>,
    max_tokens: usize,
}

impl FundamentalStage {
    /// Create the stage
    pub fn new(reasoning: Arc<ReasoningClient>, max_tokens: usize) -> Self {
        Self {
            reasoning,
            max_tokens,
        }
    }
}

#[async_trait]
impl Stage for FundamentalStage {
    type Input = MarketDataPayload;
    type Output = FundamentalAnalysis;

    fn name(&self) -> StageName {
        StageName::Fundamental
    }

    async fn execute(
        &self,
        input: &MarketDataPayload,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<FundamentalAnalysis>, StageError> {
        ctx.think("Interpreting key financial ratios");

        let reply = super::consult::<FundamentalAnalysis>(
            &self.reasoning,
            ctx,
            prompts::FUNDAMENTAL_ANALYST,
            prompts::fundamental_prompt(&input.symbol, &input.fundamentals),
            self.max_tokens,
        )
        .await;

        Ok(match reply {
            Ok(analysis) => StageOutput::primary(analysis.clamped()),
            Err(err) => {
                debug!(symbol = %input.symbol, "fundamental fallback: {err}");
                StageOutput::fallback(
                    FundamentalAnalysis::fallback(&input.fundamentals),
                    StageError::recoverable(
                        StageName::Fundamental,
                        ErrorCode::FundamentalFallback,
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

    fn with_pe(pe: Option<f64>) -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            pe_ratio: pe,
            ..FundamentalsSnapshot::default()
        }
    }

    #[test]
    fn test_fallback_valuation_bands() {
        let cheap = FundamentalAnalysis::fallback(&with_pe(Some(12.0)));
        assert_eq!(cheap.valuation, "cheap");
        assert_eq!(cheap.recommendation, Recommendation::Buy);
        assert!((cheap.score - 7.0).abs() < f64::EPSILON);
        assert_eq!(cheap.sector_comparison["peRelative"], "below sector average");

        let fair = FundamentalAnalysis::fallback(&with_pe(Some(25.0)));
        assert_eq!(fair.valuation, "fairly valued");
        assert_eq!(fair.recommendation, Recommendation::Hold);
        assert!((fair.score - 6.0).abs() < f64::EPSILON);
        assert_eq!(fair.sector_comparison["peRelative"], "above sector average");

        let expensive = FundamentalAnalysis::fallback(&with_pe(Some(45.0)));
        assert_eq!(expensive.valuation, "expensive");
        assert_eq!(expensive.sector_comparison["peSectorAvg"], 20.0);
    }

    #[test]
    fn test_fallback_without_pe_is_fairly_valued() {
        for pe in [None, Some(0.0), Some(-3.0)] {
            let analysis = FundamentalAnalysis::fallback(&with_pe(pe));
            assert_eq!(analysis.valuation, "fairly valued");
            assert_eq!(analysis.recommendation, Recommendation::Hold);
            assert_eq!(analysis.sector_comparison["peRelative"], "n/a");
        }
    }

    #[test]
    fn test_fallback_growth_and_metrics() {
        let snapshot = FundamentalsSnapshot {
            pe_ratio: Some(28.5),
            revenue_per_share: Some(25.1),
            ..FundamentalsSnapshot::default()
        };
        let analysis = FundamentalAnalysis::fallback(&snapshot);
        assert_eq!(analysis.growth_potential, GrowthPotential::High);
        assert_eq!(analysis.metrics["peRatio"], 28.5);
        assert!((analysis.confidence - 0.55).abs() < f64::EPSILON);

        let analysis = FundamentalAnalysis::fallback(&FundamentalsSnapshot::default());
        assert_eq!(analysis.growth_potential, GrowthPotential::Medium);
    }

    #[tokio::test]
    async fn test_reasoning_reply_parsed() {
        let reply = r#"{"valuation": "expensive", "growthPotential": "low",
            "recommendation": "sell", "confidence": 0.8, "score": 3.5,
            "strengths": ["Brand"], "weaknesses": ["Debt"]}"#;
        let stage = FundamentalStage::new(
            client(ScriptedProvider::new().route("CFA charterholder", reply)),
            500,
        );
        let ledger = UsageLedger::new();
        let ctx = context(StageName::Fundamental, &[], &ledger);

        let output = stage.execute(&rising(5), &ctx).await.unwrap();
        assert!(!output.is_degraded());
        assert_eq!(output.payload.recommendation, Recommendation::Sell);
        assert_eq!(output.payload.growth_potential, GrowthPotential::Low);
        assert!(output.payload.metrics.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let stage = FundamentalStage::new(
            client(ScriptedProvider::new().fail_route("CFA charterholder", "upstream 500")),
            500,
        );
        let ledger = UsageLedger::new();
        let ctx = context(StageName::Fundamental, &[], &ledger);

        let output = stage.execute(&rising(5), &ctx).await.unwrap();
        let error = output.degraded.unwrap();
        assert_eq!(error.code, ErrorCode::FundamentalFallback);
        assert_eq!(error.stage, StageName::Fundamental);
        // fixture P/E 28.5
        assert_eq!(output.payload.valuation, "fairly valued");
    }
}
