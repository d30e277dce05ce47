//! Command-line interface for marketmind
//!
//! # Usage
//!
//! ```bash
//! # Live reasoning through OpenRouter
//! export OPENROUTER_API_KEY="sk-or-..."
//! marketmind analyze AAPL
//!
//! # Canned replies, no network
//! marketmind analyze MSFT --offline --json
//!
//! # Saved analyses
//! marketmind history
//! ```

mod demo;

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use marketmind::{
    AnalysisConfig, AnalysisRecord, AnalysisSink, CachedMarketData, JsonHistoryStore,
    Orchestrator, SyntheticMarketData, TracingObserver,
};
use marketmind_llm::{
    LLMProvider, OpenAIProvider, QueueConfig, ReasoningClient, ReasoningConfig,
};
use marketmind_utils::{Config, LogFormat};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_HISTORY: &str = "marketmind-history.json";

#[derive(Parser, Debug)]
#[command(name = "marketmind")]
#[command(about = "Staged stock analysis with LLM reasoning and local fallbacks", long_about = None)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a ticker symbol
    Analyze {
        /// Ticker symbol, e.g. AAPL
        symbol: String,

        /// Use canned reasoning replies instead of a live model
        #[arg(long)]
        offline: bool,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,

        /// History file
        #[arg(long, default_value = DEFAULT_HISTORY)]
        history: PathBuf,

        /// Do not save the record to history
        #[arg(long)]
        no_save: bool,
    },

    /// List saved analyses
    History {
        /// History file
        #[arg(long, default_value = DEFAULT_HISTORY)]
        history: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env()?;
    let format = if args.json_logs {
        LogFormat::Json
    } else {
        config.log_format
    };
    marketmind_utils::init_tracing(format);
    info!(environment = %config.environment, "starting {}", config.app_name);

    match args.command {
        Command::Analyze {
            symbol,
            offline,
            json,
            history,
            no_save,
        } => analyze(&symbol, offline, json, history, no_save).await,
        Command::History { history } => show_history(history).await,
    }
}

async fn analyze(
    symbol: &str,
    offline: bool,
    json: bool,
    history: PathBuf,
    no_save: bool,
) -> anyhow::Result<()> {
    let config = AnalysisConfig::default();
    let reasoning = reasoning_client(offline)?;
    let source = CachedMarketData::from_config(SyntheticMarketData::new(), &config);

    let mut builder = Orchestrator::builder()
        .source(Arc::new(source))
        .reasoning(reasoning)
        .config(config)
        .observer(Arc::new(TracingObserver));
    if !no_save {
        builder = builder.sink(Arc::new(JsonHistoryStore::new(history)) as Arc<dyn AnalysisSink>);
    }
    let orchestrator = builder.build()?;

    let record = orchestrator
        .run(symbol)
        .await
        .with_context(|| format!("analysis of {symbol} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

fn reasoning_client(offline: bool) -> anyhow::Result<Arc<ReasoningClient>> {
    let (provider, config): (Arc<dyn LLMProvider>, ReasoningConfig) = if offline {
        (
            Arc::new(demo::provider()),
            ReasoningConfig::default().with_queue(QueueConfig::unthrottled()),
        )
    } else {
        let provider = OpenAIProvider::from_env()
            .context("set OPENROUTER_API_KEY or pass --offline")?;
        (Arc::new(provider), ReasoningConfig::from_env())
    };
    info!(provider = provider.name(), model = %config.model, "reasoning configured");
    Ok(Arc::new(ReasoningClient::new(provider, config)))
}

async fn show_history(path: PathBuf) -> anyhow::Result<()> {
    let store = JsonHistoryStore::new(path);
    let records = store
        .load()
        .await
        .with_context(|| format!("reading {}", store.path().display()))?;

    if records.is_empty() {
        println!("No saved analyses in {}", store.path().display());
        return Ok(());
    }

    let mut table = table();
    table.set_header(vec![
        "Symbol",
        "Recommendation",
        "Composite",
        "Confidence",
        "Fallbacks",
        "Analyzed",
    ]);
    for record in &records {
        table.add_row(vec![
            record.symbol.clone(),
            record.final_recommendation.to_string(),
            format!("{:.1}", record.composite_score),
            format!("{:.0}%", record.overall_confidence * 100.0),
            record.errors.len().to_string(),
            record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_record(record: &AnalysisRecord) {
    println!(
        "{}: {} (composite {:.1}, confidence {:.0}%)\n",
        record.symbol,
        record.final_recommendation,
        record.composite_score,
        record.overall_confidence * 100.0
    );

    let mut scores = table();
    scores.set_header(vec!["Stage", "Score"]);
    let agent = &record.agent_scores;
    for (stage, score) in [
        ("technical", agent.technical),
        ("fundamental", agent.fundamental),
        ("sentiment", agent.sentiment),
        ("risk", agent.risk),
    ] {
        scores.add_row(vec![stage.to_string(), format!("{score:.1}")]);
    }
    println!("{scores}");

    if let Some(report) = &record.full_data.report {
        if !report.executive_summary.is_empty() {
            println!("\n{}", report.executive_summary);
        }
        for insight in &report.key_insights {
            println!("  - {insight}");
        }
    }

    if let Some(risk) = &record.full_data.risk {
        println!(
            "\nRisk {:?}: position {}, stop loss {:.2}",
            risk.risk_level, risk.recommended_position_size, risk.stop_loss_level
        );
    }

    if !record.errors.is_empty() {
        let mut errors = table();
        errors.set_header(vec!["Stage", "Code", "Message"]);
        for error in &record.errors {
            errors.add_row(vec![
                error.stage.to_string(),
                error.code.to_string(),
                error.message.clone(),
            ]);
        }
        println!("\nFallbacks used:\n{errors}");
    }

    println!(
        "\nReasoning calls: {} ({} tokens, ~${:.4})",
        record.usage.requests,
        record.usage.total_tokens(),
        record.usage.estimated_cost
    );
}
