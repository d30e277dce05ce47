//! User message templates for the reasoning-backed stages

use crate::error::PromptError;
use crate::market::{FundamentalsSnapshot, MarketDataPayload, NewsHeadline};
use crate::stages::{ReportInput, TechnicalIndicators};
use minijinja::Environment;
use serde_json::json;

/// Closes listed in the technical prompt
pub const RECENT_BARS: usize = 30;

const TECHNICAL_TEMPLATE: &str = r#"Analyze this stock data and provide insights.
Stock: {{ symbol }}
Current Price: ${{ price }}

Technical Indicators:
- RSI(14): {{ rsi }}
- MACD: {{ macd }}
- SMA(20): {{ sma20 }}, SMA(50): {{ sma50 }}, SMA(200): {{ sma200 }}
- Bollinger Bands: {{ bollinger }}

Recent Price Action (last {{ recent|length }} days):
{% for line in recent -%}
{{ line }}
{% endfor %}
Respond ONLY with valid JSON (no markdown, no backticks):
{
  "trend": "bullish|bearish|neutral",
  "trendStrength": "weak|moderate|strong",
  "signals": ["array of identified signals"],
  "support": [price levels],
  "resistance": [price levels],
  "recommendation": "BUY|HOLD|SELL",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation",
  "score": 0-10
}"#;

const FUNDAMENTAL_TEMPLATE: &str = r#"Review this company's metrics and provide an assessment.

Stock: {{ symbol }}
Metrics: {{ metrics }}

Respond ONLY with valid JSON:
{
  "metrics": {...},
  "sectorComparison": {...},
  "valuation": "cheap|fairly valued|expensive",
  "growthPotential": "low|medium|high",
  "strengths": [],
  "weaknesses": [],
  "recommendation": "BUY|HOLD|SELL",
  "confidence": 0-1,
  "reasoning": "",
  "score": 0-10
}"#;

const SENTIMENT_TEMPLATE: &str = r#"Analyze these news headlines.
Stock: {{ symbol }}

News Headlines (last {{ days }} days):
{% for item in headlines -%}
- {{ item.title }} ({{ item.source }}, {{ item.published_at }})
{% else -%}
- No headlines published in this window
{% endfor %}
Respond ONLY with valid JSON (no markdown):
{
  "overallSentiment": "positive|negative|neutral",
  "sentimentScore": 0-10,
  "keyThemes": [],
  "risks": [],
  "catalysts": [],
  "marketMood": "fearful|cautious|neutral|optimistic|greedy",
  "newsCount": number,
  "positiveCount": number,
  "negativeCount": number,
  "neutralCount": number,
  "reasoning": "",
  "score": 0-10
}"#;

const REPORT_TEMPLATE: &str = r#"Review each agent's outputs and respond with strict JSON matching:
{
  "finalRecommendation": "BUY|HOLD|SELL",
  "overallConfidence": 0-1,
  "compositeScore": 0-10,
  "executiveSummary": "",
  "agentConsensus": {"agreement": "low|medium|high", "conflictingAgents": [], "consensus": "BUY|HOLD|SELL"},
  "keyInsights": [],
  "actionItems": [],
  "fullReport": "markdown"
}

Market Data: {{ market }}
Technical: {{ technical }}
Fundamental: {{ fundamental }}
Sentiment: {{ sentiment }}
Risk: {{ risk }}"#;

fn render(
    name: &'static str,
    template: &str,
    vars: &serde_json::Value,
) -> Result<String, PromptError> {
    let env = Environment::new();
    let value = minijinja::value::Value::from_serialize(vars);
    env.render_str(template, value)
        .map_err(|e| PromptError::Render {
            name,
            detail: e.to_string(),
        })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// Technical stage prompt: indicators plus the most recent closes
pub fn technical_prompt(
    market: &MarketDataPayload,
    indicators: &TechnicalIndicators,
) -> Result<String, PromptError> {
    let recent: Vec<String> = market
        .bars()
        .iter()
        .take(RECENT_BARS)
        .map(|bar| format!("{}: close={:.2}", bar.date, bar.close))
        .collect();

    let macd = match &indicators.macd {
        Some(macd) => serde_json::to_string(macd)?,
        None => "{}".to_string(),
    };
    let bollinger = match &indicators.bollinger_bands {
        Some(bands) => serde_json::to_string(bands)?,
        None => "{}".to_string(),
    };

    render(
        "technical",
        TECHNICAL_TEMPLATE,
        &json!({
            "symbol": market.symbol,
            "price": format!("{:.2}", market.current_price),
            "rsi": fmt_opt(indicators.rsi),
            "macd": macd,
            "sma20": fmt_opt(indicators.sma20),
            "sma50": fmt_opt(indicators.sma50),
            "sma200": fmt_opt(indicators.sma200),
            "bollinger": bollinger,
            "recent": recent,
        }),
    )
}

/// Fundamental stage prompt
pub fn fundamental_prompt(
    symbol: &str,
    fundamentals: &FundamentalsSnapshot,
) -> Result<String, PromptError> {
    render(
        "fundamental",
        FUNDAMENTAL_TEMPLATE,
        &json!({
            "symbol": symbol,
            "metrics": serde_json::to_string_pretty(fundamentals)?,
        }),
    )
}

/// Sentiment stage prompt listing at most `limit` headlines
pub fn sentiment_prompt(
    symbol: &str,
    news: &[NewsHeadline],
    days: u32,
    limit: usize,
) -> Result<String, PromptError> {
    let headlines: Vec<serde_json::Value> = news
        .iter()
        .take(limit)
        .map(|item| {
            json!({
                "title": item.title,
                "source": item.source,
                "published_at": item.published_at.to_rfc3339(),
            })
        })
        .collect();

    render(
        "sentiment",
        SENTIMENT_TEMPLATE,
        &json!({
            "symbol": symbol,
            "days": days,
            "headlines": headlines,
        }),
    )
}

/// Report stage prompt embedding every upstream result as JSON
pub fn report_prompt(input: &ReportInput) -> Result<String, PromptError> {
    render(
        "report",
        REPORT_TEMPLATE,
        &json!({
            "market": serde_json::to_string(&*input.market)?,
            "technical": serde_json::to_string(&*input.technical)?,
            "fundamental": serde_json::to_string(&*input.fundamental)?,
            "sentiment": serde_json::to_string(&*input.sentiment)?,
            "risk": serde_json::to_string(&*input.risk)?,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{PriceBar, PriceSnapshot};
    use chrono::{Days, NaiveDate, TimeZone, Utc};

    fn payload(bars: usize, news: Vec<NewsHeadline>) -> MarketDataPayload {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let historical_prices = (0..bars)
            .map(|i| {
                PriceBar::flat(
                    start.checked_add_days(Days::new(i as u64)).unwrap(),
                    100.0 + i as f64,
                )
            })
            .collect();
        MarketDataPayload::new(
            "AAPL",
            PriceSnapshot {
                current_price: 150.0,
                previous_close: None,
                price_change: None,
                price_change_percent: None,
                historical_prices,
            },
            FundamentalsSnapshot {
                pe_ratio: Some(28.5),
                ..FundamentalsSnapshot::default()
            },
            news,
            Utc::now(),
        )
    }

    fn headline(i: usize) -> NewsHeadline {
        NewsHeadline {
            title: format!("Headline {i}"),
            source: "Wire".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            url: String::new(),
            sentiment: None,
        }
    }

    #[test]
    fn test_technical_prompt_lists_recent_closes() {
        let market = payload(40, Vec::new());
        let indicators = TechnicalIndicators {
            rsi: Some(55.123),
            ..TechnicalIndicators::default()
        };
        let prompt = technical_prompt(&market, &indicators).unwrap();

        assert!(prompt.contains("Stock: AAPL"));
        assert!(prompt.contains("Current Price: $150.00"));
        assert!(prompt.contains("RSI(14): 55.12"));
        assert!(prompt.contains("SMA(200): n/a"));
        assert!(prompt.contains("last 30 days"));
        // newest bar first, oldest ten dropped
        assert!(prompt.contains("2024-02-09: close=139.00"));
        assert!(!prompt.contains("2024-01-10: close="));
        assert!(prompt.contains("\"trendStrength\""));
    }

    #[test]
    fn test_fundamental_prompt_embeds_metrics() {
        let market = payload(1, Vec::new());
        let prompt = fundamental_prompt(&market.symbol, &market.fundamentals).unwrap();
        assert!(prompt.contains("\"peRatio\": 28.5"));
        assert!(prompt.contains("\"growthPotential\""));
    }

    #[test]
    fn test_sentiment_prompt_caps_headlines() {
        let news: Vec<_> = (0..25).map(headline).collect();
        let prompt = sentiment_prompt("AAPL", &news, 7, 20).unwrap();
        assert!(prompt.contains("- Headline 19 (Wire, 2024-06-01T12:00:00+00:00)"));
        assert!(!prompt.contains("Headline 20"));
        assert!(prompt.contains("last 7 days"));

        let empty = sentiment_prompt("AAPL", &[], 7, 20).unwrap();
        assert!(empty.contains("No headlines published"));
    }
}
