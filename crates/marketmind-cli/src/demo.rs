//! Canned reasoning replies for `--offline` runs

use marketmind_llm::ScriptedProvider;

const TECHNICAL: &str = r#"{
  "trend": "bullish",
  "trendStrength": "moderate",
  "signals": ["Price holding above the 20-day average", "Momentum improving"],
  "support": [],
  "resistance": [],
  "recommendation": "BUY",
  "confidence": 0.65,
  "reasoning": "Offline demo reply: steady uptrend with room before overbought territory.",
  "score": 6.8
}"#;

const FUNDAMENTAL: &str = r#"{
  "valuation": "fairly valued",
  "growthPotential": "medium",
  "strengths": ["Healthy margins"],
  "weaknesses": ["Premium multiple versus peers"],
  "recommendation": "HOLD",
  "confidence": 0.6,
  "reasoning": "Offline demo reply: solid business priced close to fair value.",
  "score": 6.2
}"#;

const SENTIMENT: &str = r#"{
  "overallSentiment": "positive",
  "sentimentScore": 6.5,
  "keyThemes": ["Product launches", "Analyst upgrades"],
  "risks": ["Regulatory scrutiny"],
  "catalysts": ["Upcoming earnings"],
  "marketMood": "optimistic",
  "newsCount": 3,
  "positiveCount": 2,
  "negativeCount": 0,
  "neutralCount": 1,
  "reasoning": "Offline demo reply: coverage leans constructive.",
  "score": 6.5
}"#;

const REPORT: &str = r##"{
  "finalRecommendation": "HOLD",
  "overallConfidence": 0.62,
  "compositeScore": 6.4,
  "executiveSummary": "Offline demo reply: constructive trend and news, valuation keeps conviction moderate.",
  "agentConsensus": {"agreement": "medium", "conflictingAgents": ["fundamental"], "consensus": "HOLD"},
  "keyInsights": ["Trend and sentiment agree", "Valuation caps upside"],
  "actionItems": ["Hold existing exposure", "Revisit after earnings"],
  "fullReport": "# Offline demo report\n\nThese figures come from canned replies, not a live model."
}"##;

/// Provider answering each stage with a fixed reply
pub fn provider() -> ScriptedProvider {
    ScriptedProvider::new()
        .route("technical analysis expert", TECHNICAL)
        .route("CFA charterholder", FUNDAMENTAL)
        .route("financial news sentiment", SENTIMENT)
        .route("synthesize findings", REPORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketmind::stages::{FundamentalAnalysis, Report, SentimentAnalysis, TechnicalAnalysis};

    #[test]
    fn test_replies_parse() {
        marketmind_llm::parse_json::<TechnicalAnalysis>(TECHNICAL).unwrap();
        marketmind_llm::parse_json::<FundamentalAnalysis>(FUNDAMENTAL).unwrap();
        marketmind_llm::parse_json::<SentimentAnalysis>(SENTIMENT).unwrap();
        marketmind_llm::parse_json::<Report>(REPORT).unwrap();
    }
}
