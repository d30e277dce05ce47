//! Stage abstraction shared by every pipeline step

use crate::error::StageError;
use crate::observer::AnalysisObserver;
use async_trait::async_trait;
use marketmind_llm::UsageLedger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageName {
    /// Fetches price, fundamentals and news
    MarketData,
    /// Indicators plus narrative trend analysis
    Technical,
    /// Valuation and growth assessment
    Fundamental,
    /// News sentiment classification
    Sentiment,
    /// Local volatility and drawdown scoring
    Risk,
    /// Final synthesis
    Report,
}

impl StageName {
    /// All stages in execution order
    pub const ALL: [Self; 6] = [
        Self::MarketData,
        Self::Technical,
        Self::Fundamental,
        Self::Sentiment,
        Self::Risk,
        Self::Report,
    ];

    /// Wire name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "marketData",
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Sentiment => "sentiment",
            Self::Risk => "risk",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage lifecycle: idle, then working, then completed or error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageStatus {
    /// Not started in this run
    Idle,
    /// Executing
    Working,
    /// Produced a result, possibly a fallback
    Completed,
    /// Failed without a result
    Error,
}

impl StageStatus {
    /// Completed or error
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Trading recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    /// Open or add to a position
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    /// Keep current exposure
    #[serde(rename = "HOLD", alias = "hold", alias = "Hold")]
    Hold,
    /// Reduce or exit
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
}

impl Recommendation {
    /// Threshold rule applied to a 0-10 composite score
    pub fn from_composite(score: f64) -> Self {
        if score > 6.5 {
            Self::Buy
        } else if score > 5.0 {
            Self::Hold
        } else {
            Self::Sell
        }
    }

    /// Upper-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a score into 0-10, mapping NaN to the neutral midpoint
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() { 5.0 } else { score.clamp(0.0, 10.0) }
}

/// Clamp a confidence into 0-1, mapping NaN to zero
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Result of a stage execution
///
/// `degraded` carries the error a stage absorbed when it substituted its
/// fallback payload. The stage still completed.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    /// Stage result
    pub payload: T,
    /// Error absorbed by the fallback, if one was used
    pub degraded: Option<StageError>,
}

impl<T> StageOutput<T> {
    /// Result from the primary path
    pub fn primary(payload: T) -> Self {
        Self {
            payload,
            degraded: None,
        }
    }

    /// Fallback result with the error that triggered it
    pub fn fallback(payload: T, error: StageError) -> Self {
        Self {
            payload,
            degraded: Some(error),
        }
    }

    /// Whether the fallback was used
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Event sink and shared run state handed to a stage
pub struct StageContext<'a> {
    stage: StageName,
    observers: &'a [Arc<dyn AnalysisObserver>],
    ledger: &'a UsageLedger,
}

impl<'a> StageContext<'a> {
    /// Create a context for one stage of a run
    pub fn new(
        stage: StageName,
        observers: &'a [Arc<dyn AnalysisObserver>],
        ledger: &'a UsageLedger,
    ) -> Self {
        Self {
            stage,
            observers,
            ledger,
        }
    }

    /// Stage this context belongs to
    pub fn stage(&self) -> StageName {
        self.stage
    }

    /// Usage ledger of the current run
    pub fn ledger(&self) -> &UsageLedger {
        self.ledger
    }

    /// Publish a status transition
    pub fn status(&self, status: StageStatus) {
        for observer in self.observers {
            observer.on_stage_status(self.stage, status);
        }
    }

    /// Publish an incremental progress note
    pub fn think(&self, note: impl AsRef<str>) {
        tracing::debug!(stage = %self.stage, note = note.as_ref(), "thinking");
        for observer in self.observers {
            observer.on_thinking(self.stage, note.as_ref());
        }
    }

    /// Publish an error event
    pub fn error(&self, error: &StageError) {
        for observer in self.observers {
            observer.on_error(error);
        }
    }
}

/// A unit of the analysis pipeline
///
/// Stages that consult the reasoning collaborator never return `Err`; they
/// return a fallback payload with `degraded` set. Only the market data stage
/// fails outright.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Input borrowed from the orchestrator
    type Input: Sync + ?Sized;
    /// Payload produced once per run
    type Output: Send;

    /// Stage identifier
    fn name(&self) -> StageName;

    /// Run the stage
    async fn execute(
        &self,
        input: &Self::Input,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput<Self::Output>, StageError>;
}
