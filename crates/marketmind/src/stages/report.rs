//! Final report stage

use crate::error::{ErrorCode, StageError};
use crate::market::MarketDataPayload;
use crate::prompts;
use crate::stage::{
    Recommendation, Stage, StageContext, StageName, StageOutput, clamp_confidence, clamp_score,
};
use crate::stages::{FundamentalAnalysis, RiskAnalysis, SentimentAnalysis, TechnicalAnalysis};
use async_trait::async_trait;
use marketmind_llm::ReasoningClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How many stages back the consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

/// Consensus across stage recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConsensus {
    pub agreement: Agreement,
    #[serde(default)]
    pub conflicting_agents: Vec<String>,
    pub consensus: Recommendation,
}

/// Report stage result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub final_recommendation: Recommendation,
    pub overall_confidence: f64,
    pub composite_score: f64,
    #[serde(default)]
    pub executive_summary: String,
    pub agent_consensus: AgentConsensus,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Markdown
    #[serde(default)]
    pub full_report: String,
}

impl Report {
    /// Local synthesis from the upstream scores
    pub fn fallback(input: &ReportInput) -> Self {
        let scores = [
            ("Technical", input.technical.score),
            ("Fundamental", input.fundamental.score),
            ("Sentiment", input.sentiment.score),
            ("Risk", input.risk.score),
        ];
        let composite = scores.iter().map(|(_, score)| score).sum::<f64>() / scores.len() as f64;
        let recommendation = Recommendation::from_composite(composite);
        let consensus = consensus(input, recommendation);

        let key_insights: Vec<String> = scores
            .iter()
            .map(|(name, score)| format!("{name} score: {score:.1}"))
            .collect();

        let mut full_report = format!(
            "# Investment Analysis Report: {}\n\n- Composite Score: {composite:.1}\n- Recommendation: {recommendation}\n",
            input.market.symbol
        );
        full_report.push_str(&format!(
            "- Agreement: {:?}\n\n## Agent Scores\n\n",
            consensus.agreement
        ));
        for insight in &key_insights {
            full_report.push_str(&format!("- {insight}\n"));
        }
        full_report.push_str(
            "\nThis report was generated using fallback heuristics due to an upstream LLM issue.",
        );

        Self {
            final_recommendation: recommendation,
            overall_confidence: 0.6,
            composite_score: composite,
            executive_summary: format!(
                "Fallback synthesis for {}: composite score {composite:.1} points to {recommendation}.",
                input.market.symbol
            ),
            agent_consensus: consensus,
            key_insights,
            action_items: vec![
                "Monitor key support levels".to_string(),
                "Review risk limits before entry".to_string(),
            ],
            full_report,
        }
    }

    fn clamped(mut self) -> Self {
        self.composite_score = clamp_score(self.composite_score);
        self.overall_confidence = clamp_confidence(self.overall_confidence);
        self
    }
}

/// Count the stage votes that match `consensus`
fn consensus(input: &ReportInput, consensus: Recommendation) -> AgentConsensus {
    let votes = [
        (StageName::Technical, input.technical.recommendation),
        (StageName::Fundamental, input.fundamental.recommendation),
        (
            StageName::Sentiment,
            input.sentiment.overall_sentiment.as_recommendation(),
        ),
    ];
    let conflicting_agents: Vec<String> = votes
        .iter()
        .filter(|(_, vote)| *vote != consensus)
        .map(|(stage, _)| stage.to_string())
        .collect();

    let agreement = match votes.len() - conflicting_agents.len() {
        3 => Agreement::High,
        2 => Agreement::Medium,
        _ => Agreement::Low,
    };

    AgentConsensus {
        agreement,
        conflicting_agents,
        consensus,
    }
}

/// Every upstream result
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub market: Arc<MarketDataPayload>,
    pub technical: Arc<TechnicalAnalysis>,
    pub fundamental: Arc<FundamentalAnalysis>,
    pub sentiment: Arc<SentimentAnalysis>,
    pub risk: Arc<RiskAnalysis>,
}

/// Synthesizes the final recommendation
pub struct ReportStage {
    reasoning: Arc<ReasoningClient>,
    max_tokens: usize,
}

impl ReportStage {
    /// Create the stage
    pub fn new(reasoning: Arc<ReasoningClient>, max_tokens: usize) -> Self {
        Self {
            reasoning,
            max_tokens,
        }
    }
}

#[async_trait]
impl Stage for ReportStage {
    type Input = ReportInput;
    type Output = Report;

    fn name(&self) -> StageName {
        StageName::Report
    }

    async fn execute(
        &self,
        input: &ReportInput,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<Report>, StageError> {
        ctx.think("Combining agent findings into final recommendation");

        let reply = super::consult::<Report>(
            &self.reasoning,
            ctx,
            prompts::REPORT_SYNTHESIZER,
            prompts::report_prompt(input),
            self.max_tokens,
        )
        .await;

        Ok(match reply {
            Ok(report) => StageOutput::primary(report.clamped()),
            Err(err) => {
                debug!(symbol = %input.market.symbol, "report fallback: {err}");
                StageOutput::fallback(
                    Report::fallback(input),
                    StageError::recoverable(
                        StageName::Report,
                        ErrorCode::ReportFallback,
                        err.to_string(),
                    ),
                )
            }
        })
    }
}
