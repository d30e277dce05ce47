//! Run state published to observers

use crate::error::StageError;
use crate::market::MarketDataPayload;
use crate::stage::StageName;
use crate::stages::{
    FundamentalAnalysis, Report, RiskAnalysis, SentimentAnalysis, TechnicalAnalysis,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Idle,
    Initializing,
    Data,
    Analysis,
    Risk,
    Report,
    Completed,
    Error,
}

impl AnalysisPhase {
    /// Completed or error
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One optional slot per stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub market_data: Option<Arc<MarketDataPayload>>,
    pub technical: Option<Arc<TechnicalAnalysis>>,
    pub fundamental: Option<Arc<FundamentalAnalysis>>,
    pub sentiment: Option<Arc<SentimentAnalysis>>,
    pub risk: Option<Arc<RiskAnalysis>>,
    pub report: Option<Arc<Report>>,
}

/// Snapshot of a run in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub symbol: String,
    pub phase: AnalysisPhase,
    /// Fraction complete, 0-1, never decreasing within a run
    pub progress: f64,
    pub active_stage: Option<StageName>,
    pub results: AnalysisResults,
    pub errors: Vec<StageError>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisState {
    /// Fresh idle state for `symbol`
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            phase: AnalysisPhase::Idle,
            progress: 0.0,
            active_stage: None,
            results: AnalysisResults::default(),
            errors: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Move to `phase` with `active` as the running sequential stage
    pub fn enter(&mut self, phase: AnalysisPhase, active: Option<StageName>, progress: f64) {
        self.phase = phase;
        self.active_stage = active;
        self.advance(progress);
        if phase.is_terminal() {
            self.active_stage = None;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Raise progress; lower values are ignored
    pub fn advance(&mut self, progress: f64) {
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let mut state = AnalysisState::new("AAPL");
        state.enter(AnalysisPhase::Data, Some(StageName::MarketData), 0.25);
        state.advance(0.1);
        assert!((state.progress - 0.25).abs() < f64::EPSILON);
        state.advance(4.0);
        assert!((state.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminal_phase_clears_active_stage() {
        let mut state = AnalysisState::new("AAPL");
        state.enter(AnalysisPhase::Risk, Some(StageName::Risk), 0.75);
        assert_eq!(state.active_stage, Some(StageName::Risk));
        assert!(state.completed_at.is_none());

        state.enter(AnalysisPhase::Error, Some(StageName::Risk), 0.75);
        assert_eq!(state.active_stage, None);
        assert!(state.completed_at.is_some());
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(
            serde_json::to_string(&AnalysisPhase::Initializing).unwrap(),
            "\"initializing\""
        );
    }
}
