//! Observer hooks for analysis progress

use crate::error::StageError;
use crate::orchestrator::AnalysisState;
use crate::stage::{StageName, StageStatus};
use tracing::{debug, info, warn};

/// Receives run events synchronously at the point of mutation
///
/// All methods default to no-ops so observers implement only what they need.
pub trait AnalysisObserver: Send + Sync {
    /// Called after every state mutation
    fn on_state(&self, _state: &AnalysisState) {}

    /// Called on each stage status transition
    fn on_stage_status(&self, _stage: StageName, _status: StageStatus) {}

    /// Called when a stage publishes a progress note
    fn on_thinking(&self, _stage: StageName, _note: &str) {}

    /// Called for every stage error, including those absorbed by fallbacks
    fn on_error(&self, _error: &StageError) {}
}

/// Observer that forwards events to `tracing`
pub struct TracingObserver;

impl AnalysisObserver for TracingObserver {
    fn on_state(&self, state: &AnalysisState) {
        info!(
            symbol = %state.symbol,
            phase = ?state.phase,
            progress = state.progress,
            "analysis progress"
        );
    }

    fn on_stage_status(&self, stage: StageName, status: StageStatus) {
        if status.is_terminal() {
            info!(stage = %stage, status = ?status, "stage finished");
        } else {
            debug!(stage = %stage, status = ?status, "stage status");
        }
    }

    fn on_thinking(&self, stage: StageName, note: &str) {
        info!(stage = %stage, "{note}");
    }

    fn on_error(&self, error: &StageError) {
        warn!(
            stage = %error.stage,
            code = %error.code,
            recoverable = error.recoverable,
            "{}",
            error.message
        );
    }
}
