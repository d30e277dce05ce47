//! Summary of a completed run

use crate::error::{ErrorCode, StageError};
use crate::orchestrator::{AnalysisResults, AnalysisState};
use crate::stage::{Recommendation, StageName};
use chrono::{DateTime, Utc};
use marketmind_llm::UsageSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-stage scores, 0-10
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentScores {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    pub risk: f64,
}

/// Completed analysis, suitable for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub final_recommendation: Recommendation,
    pub overall_confidence: f64,
    pub composite_score: f64,
    pub agent_scores: AgentScores,
    pub full_data: AnalysisResults,
    /// Reasoning calls made during the run
    #[serde(default)]
    pub usage: UsageSummary,
    /// Every error raised during the run, fallbacks included
    #[serde(default)]
    pub errors: Vec<StageError>,
}

impl AnalysisRecord {
    /// Build a record from a completed state
    ///
    /// Fails when any stage result is missing.
    pub fn from_state(state: &AnalysisState, usage: UsageSummary) -> Result<Self, StageError> {
        let results = &state.results;
        let missing = |stage: StageName| {
            StageError::fatal(
                stage,
                ErrorCode::OrchestratorError,
                format!("{stage} result missing from completed run"),
            )
        };

        let technical = results.technical.as_ref().ok_or_else(|| missing(StageName::Technical))?;
        let fundamental = results
            .fundamental
            .as_ref()
            .ok_or_else(|| missing(StageName::Fundamental))?;
        let sentiment = results.sentiment.as_ref().ok_or_else(|| missing(StageName::Sentiment))?;
        let risk = results.risk.as_ref().ok_or_else(|| missing(StageName::Risk))?;
        let report = results.report.as_ref().ok_or_else(|| missing(StageName::Report))?;

        Ok(Self {
            id: Uuid::new_v4(),
            symbol: state.symbol.clone(),
            timestamp: state.completed_at.unwrap_or_else(Utc::now),
            final_recommendation: report.final_recommendation,
            overall_confidence: report.overall_confidence,
            composite_score: report.composite_score,
            agent_scores: AgentScores {
                technical: technical.score,
                fundamental: fundamental.score,
                sentiment: sentiment.score,
                risk: risk.score,
            },
            full_data: results.clone(),
            usage,
            errors: state.errors.clone(),
        })
    }
}
