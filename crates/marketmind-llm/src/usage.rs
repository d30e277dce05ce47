//! Token and cost accounting for a single analysis run

use crate::TokenUsage;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Price of a model in dollars per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Dollars per million input tokens
    pub input_per_million: f64,
    /// Dollars per million output tokens
    pub output_per_million: f64,
}

impl Default for ModelPricing {
    // gpt-4o-mini list prices, used as an estimate for OpenRouter models
    fn default() -> Self {
        Self {
            input_per_million: 0.15,
            output_per_million: 0.60,
        }
    }
}

impl ModelPricing {
    /// Pricing for free-tier models
    pub const FREE: Self = Self {
        input_per_million: 0.0,
        output_per_million: 0.0,
    };

    /// Estimated cost of one completion
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_million
            + usage.output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

/// Totals reported with an analysis record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    /// Completions that returned successfully
    pub requests: usize,
    /// Input tokens across all completions
    pub input_tokens: usize,
    /// Output tokens across all completions
    pub output_tokens: usize,
    /// Estimated cost in dollars
    pub estimated_cost: f64,
}

impl UsageSummary {
    /// Input plus output tokens
    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Accumulates usage for one run
///
/// Shared by reference between the stages of a run. A fresh ledger is
/// created for each run so counts never leak across analyses.
#[derive(Debug, Default)]
pub struct UsageLedger {
    totals: Mutex<UsageSummary>,
}

impl UsageLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful completion
    pub fn record(&self, usage: &TokenUsage, pricing: &ModelPricing) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.requests += 1;
        totals.input_tokens += usage.input_tokens;
        totals.output_tokens += usage.output_tokens;
        totals.estimated_cost += pricing.cost(usage);
    }

    /// Current totals
    pub fn snapshot(&self) -> UsageSummary {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_estimate() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 500_000,
        };
        let cost = ModelPricing::default().cost(&usage);
        assert!((cost - 0.45).abs() < 1e-9);
        assert!(ModelPricing::FREE.cost(&usage).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ledger_accumulates() {
        let ledger = UsageLedger::new();
        let pricing = ModelPricing::default();
        ledger.record(
            &TokenUsage {
                input_tokens: 100,
                output_tokens: 20,
            },
            &pricing,
        );
        ledger.record(
            &TokenUsage {
                input_tokens: 50,
                output_tokens: 30,
            },
            &pricing,
        );

        let summary = ledger.snapshot();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.total_tokens(), 200);
        assert!(summary.estimated_cost > 0.0);
    }
}
