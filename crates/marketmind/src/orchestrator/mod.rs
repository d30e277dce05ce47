//! Analysis orchestrator
//!
//! Runs the stages in order: market data, then technical, fundamental and
//! sentiment concurrently, then risk, then the report. Every state mutation
//! is published to the registered observers.

mod record;
mod state;

pub use record::{AgentScores, AnalysisRecord};
pub use state::{AnalysisPhase, AnalysisResults, AnalysisState};

use crate::config::AnalysisConfig;
use crate::error::{ConfigError, ErrorCode, StageError};
use crate::market::MarketDataSource;
use crate::observer::AnalysisObserver;
use crate::stage::{Stage, StageContext, StageName, StageOutput, StageStatus};
use crate::stages::{
    FundamentalStage, MarketDataStage, ReportInput, ReportStage, RiskInput, RiskStage,
    SentimentStage, TechnicalStage,
};
use crate::store::AnalysisSink;
use chrono::Utc;
use marketmind_llm::{ReasoningClient, UsageLedger};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Progress checkpoints
mod checkpoint {
    pub const DATA_START: f64 = 0.15;
    pub const DATA_DONE: f64 = 0.25;
    pub const ANALYSIS_DONE: f64 = 0.65;
    pub const RISK_START: f64 = 0.75;
    pub const RISK_DONE: f64 = 0.85;
    pub const REPORT_START: f64 = 0.9;
}

/// Drives one analysis run at a time through every stage
pub struct Orchestrator {
    market_data: MarketDataStage,
    technical: TechnicalStage,
    fundamental: FundamentalStage,
    sentiment: SentimentStage,
    risk: RiskStage,
    report: ReportStage,
    observers: Vec<Arc<dyn AnalysisObserver>>,
    sink: Option<Arc<dyn AnalysisSink>>,
}

impl Orchestrator {
    /// Create a new orchestrator builder
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Analyze `symbol`
    ///
    /// Fails only when market data cannot be fetched or an internal fault
    /// prevents building the record. Analysis stage failures are absorbed by
    /// their fallbacks and listed in [`AnalysisRecord::errors`].
    #[instrument(skip(self))]
    pub async fn run(&self, symbol: &str) -> Result<AnalysisRecord, StageError> {
        let ledger = UsageLedger::new();
        let mut state = AnalysisState::new(symbol.trim().to_uppercase());
        self.publish(&state);

        state.started_at = Some(Utc::now());
        state.enter(AnalysisPhase::Initializing, None, 0.0);
        self.publish(&state);
        info!(symbol = %state.symbol, "starting analysis");

        // Market data
        state.enter(
            AnalysisPhase::Data,
            Some(StageName::MarketData),
            checkpoint::DATA_START,
        );
        self.publish(&state);
        let market = match self.drive(&self.market_data, symbol, &ledger).await {
            Ok(output) => self.absorb(&mut state, output),
            Err(err) => return Err(self.fail(&mut state, err)),
        };
        state.symbol.clone_from(&market.symbol);
        state.results.market_data = Some(Arc::clone(&market));
        state.advance(checkpoint::DATA_DONE);
        self.publish(&state);

        // Technical, fundamental and sentiment in parallel
        state.enter(AnalysisPhase::Analysis, None, checkpoint::DATA_DONE);
        self.publish(&state);
        let (technical, fundamental, sentiment) = tokio::join!(
            self.drive(&self.technical, &*market, &ledger),
            self.drive(&self.fundamental, &*market, &ledger),
            self.drive(&self.sentiment, &*market, &ledger),
        );
        let technical = self.absorb_or_fail(&mut state, technical)?;
        let fundamental = self.absorb_or_fail(&mut state, fundamental)?;
        let sentiment = self.absorb_or_fail(&mut state, sentiment)?;
        state.results.technical = Some(Arc::clone(&technical));
        state.results.fundamental = Some(Arc::clone(&fundamental));
        state.results.sentiment = Some(Arc::clone(&sentiment));
        state.advance(checkpoint::ANALYSIS_DONE);
        self.publish(&state);

        // Risk
        state.enter(
            AnalysisPhase::Risk,
            Some(StageName::Risk),
            checkpoint::RISK_START,
        );
        self.publish(&state);
        let risk_input = RiskInput {
            market: Arc::clone(&market),
            technical: Arc::clone(&technical),
            sentiment: Arc::clone(&sentiment),
        };
        let risk = self.drive(&self.risk, &risk_input, &ledger).await;
        let risk = self.absorb_or_fail(&mut state, risk)?;
        state.results.risk = Some(Arc::clone(&risk));
        state.advance(checkpoint::RISK_DONE);
        self.publish(&state);

        // Report
        state.enter(
            AnalysisPhase::Report,
            Some(StageName::Report),
            checkpoint::REPORT_START,
        );
        self.publish(&state);
        let report_input = ReportInput {
            market,
            technical,
            fundamental,
            sentiment,
            risk,
        };
        let report = self.drive(&self.report, &report_input, &ledger).await;
        let report = self.absorb_or_fail(&mut state, report)?;
        state.results.report = Some(report);

        state.enter(AnalysisPhase::Completed, None, 1.0);
        self.publish(&state);

        let record = match AnalysisRecord::from_state(&state, ledger.snapshot()) {
            Ok(record) => record,
            Err(err) => return Err(self.fail(&mut state, err)),
        };
        info!(
            symbol = %record.symbol,
            recommendation = %record.final_recommendation,
            composite = record.composite_score,
            errors = record.errors.len(),
            "analysis completed"
        );

        if let Some(sink) = &self.sink {
            if let Err(err) = sink.save(&record).await {
                warn!(symbol = %record.symbol, "failed to save analysis: {err}");
            }
        }

        Ok(record)
    }

    /// Execute one stage with status and error events around it
    async fn drive<S: Stage>(
        &self,
        stage: &S,
        input: &S::Input,
        ledger: &UsageLedger,
    ) -> Result<StageOutput<S::Output>, StageError> {
        let ctx = StageContext::new(stage.name(), &self.observers, ledger);
        ctx.status(StageStatus::Working);

        match stage.execute(input, &ctx).await {
            Ok(output) => {
                if let Some(err) = &output.degraded {
                    ctx.error(err);
                }
                ctx.status(StageStatus::Completed);
                Ok(output)
            }
            Err(err) => {
                ctx.status(StageStatus::Error);
                Err(err)
            }
        }
    }

    /// Record a fallback error, if any, and share the payload
    fn absorb<T>(&self, state: &mut AnalysisState, output: StageOutput<T>) -> Arc<T> {
        if let Some(err) = output.degraded {
            state.errors.push(err);
            self.publish(state);
        }
        Arc::new(output.payload)
    }

    /// Like [`absorb`](Self::absorb), treating a hard failure of a
    /// non-fatal stage as an orchestrator fault
    fn absorb_or_fail<T>(
        &self,
        state: &mut AnalysisState,
        output: Result<StageOutput<T>, StageError>,
    ) -> Result<Arc<T>, StageError> {
        match output {
            Ok(output) => Ok(self.absorb(state, output)),
            Err(err) => Err(self.fail(
                state,
                StageError::fatal(err.stage, ErrorCode::OrchestratorError, err.message),
            )),
        }
    }

    /// Move the run to the error phase and report `err`
    fn fail(&self, state: &mut AnalysisState, err: StageError) -> StageError {
        warn!(
            symbol = %state.symbol,
            stage = %err.stage,
            code = %err.code,
            "analysis failed: {}",
            err.message
        );
        for observer in &self.observers {
            observer.on_error(&err);
        }
        state.errors.push(err.clone());
        let progress = state.progress;
        state.enter(AnalysisPhase::Error, None, progress);
        self.publish(state);
        err
    }

    fn publish(&self, state: &AnalysisState) {
        for observer in &self.observers {
            observer.on_state(state);
        }
    }
}

/// Builder for [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    source: Option<Arc<dyn MarketDataSource>>,
    reasoning: Option<Arc<ReasoningClient>>,
    config: Option<AnalysisConfig>,
    observers: Vec<Arc<dyn AnalysisObserver>>,
    sink: Option<Arc<dyn AnalysisSink>>,
}

impl OrchestratorBuilder {
    /// Set the market data source
    pub fn source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the reasoning client shared by every stage
    pub fn reasoning(mut self, reasoning: Arc<ReasoningClient>) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// Set the analysis configuration
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register an observer
    pub fn observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Persist completed records to `sink`
    pub fn sink(mut self, sink: Arc<dyn AnalysisSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        let source = self
            .source
            .ok_or_else(|| ConfigError("market data source is required".to_string()))?;
        let reasoning = self
            .reasoning
            .ok_or_else(|| ConfigError("reasoning client is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let tokens = config.max_tokens;
        Ok(Orchestrator {
            technical: TechnicalStage::new(Arc::clone(&reasoning), tokens.technical),
            fundamental: FundamentalStage::new(Arc::clone(&reasoning), tokens.fundamental),
            sentiment: SentimentStage::new(Arc::clone(&reasoning), &config),
            risk: RiskStage::new(config.risk_weights),
            report: ReportStage::new(reasoning, tokens.report),
            market_data: MarketDataStage::new(source, config),
            observers: self.observers,
            sink: self.sink,
        })
    }
}
