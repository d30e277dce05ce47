//! Pipeline stages
//!
//! The market data stage feeds three independent analysis stages (technical,
//! fundamental, sentiment). Risk consumes market data, technical and
//! sentiment results; the report stage consumes everything.

mod fundamental;
mod market_data;
mod report;
mod risk;
mod sentiment;
mod technical;

pub use fundamental::{FundamentalAnalysis, FundamentalStage, GrowthPotential};
pub use market_data::{MarketDataStage, normalize_symbol};
pub use report::{AgentConsensus, Agreement, Report, ReportInput, ReportStage};
pub use risk::{RiskAnalysis, RiskInput, RiskLevel, RiskStage};
pub use sentiment::{MarketMood, Sentiment, SentimentAnalysis, SentimentStage};
pub use technical::{TechnicalAnalysis, TechnicalIndicators, TechnicalStage, Trend, TrendStrength};

use crate::error::{PromptError, ReasoningError};
use crate::stage::StageContext;
use marketmind_llm::{ReasoningClient, parse_json};
use serde::de::DeserializeOwned;

/// Render, send and parse one reasoning request
async fn consult<T: DeserializeOwned>(
    client: &ReasoningClient,
    ctx: &StageContext<'_>,
    system: &str,
    prompt: Result<String, PromptError>,
    max_tokens: usize,
) -> Result<T, ReasoningError> {
    let prompt = prompt?;
    ctx.think(format!(
        "Consulting {} for deeper reasoning",
        client.provider_name()
    ));
    let text = client
        .complete(system, &prompt, max_tokens, ctx.ledger())
        .await?;
    Ok(parse_json(&text)?)
}
