//! Cost estimation for upstream LLM usage.
//!
//! A hardcoded default table covers known models, with user overrides
//! from `config.toml` taking priority and a conservative fallback for
//! anything unrecognized. Estimates feed the write-once usage log;
//! they are approximate and never shown as exact billing.

use cairn_types::config::PricingOverride;

/// Internal pricing entry for the hardcoded default table.
struct PricingEntry {
    model_pattern: &'static str,
    input_cost_per_million: f64,
    output_cost_per_million: f64,
}

/// Conservative fallback pricing when no model match is found.
const FALLBACK_INPUT_COST: f64 = 5.0;
const FALLBACK_OUTPUT_COST: f64 = 15.0;

/// Default pricing, USD per million tokens, approximate as of
/// mid 2026.
fn default_pricing_table() -> Vec<PricingEntry> {
    vec![
        PricingEntry {
            model_pattern: "claude-sonnet-4",
            input_cost_per_million: 3.0,
            output_cost_per_million: 15.0,
        },
        PricingEntry {
            model_pattern: "claude-opus-4",
            input_cost_per_million: 15.0,
            output_cost_per_million: 75.0,
        },
        PricingEntry {
            model_pattern: "claude-haiku-3",
            input_cost_per_million: 0.25,
            output_cost_per_million: 1.25,
        },
        PricingEntry {
            model_pattern: "gpt-4o-mini",
            input_cost_per_million: 0.15,
            output_cost_per_million: 0.60,
        },
        PricingEntry {
            model_pattern: "gpt-4o",
            input_cost_per_million: 2.50,
            output_cost_per_million: 10.0,
        },
    ]
}

/// Prefix match: `"claude-sonnet-4"` matches
/// `"claude-sonnet-4-20250514"`.
fn matches_pattern(model: &str, pattern: &str) -> bool {
    model.starts_with(pattern)
}

/// Estimate the cost of a completed request in USD.
///
/// Lookup order: user overrides from `config.toml`, then the default
/// table, then the conservative fallback.
pub fn estimate_cost(
    input_tokens: u32,
    output_tokens: u32,
    model: &str,
    overrides: &[PricingOverride],
) -> f64 {
    for pricing in overrides {
        if matches_pattern(model, &pricing.model_pattern) {
            return compute_cost(
                input_tokens,
                output_tokens,
                pricing.input_cost_per_million,
                pricing.output_cost_per_million,
            );
        }
    }

    for entry in default_pricing_table() {
        if matches_pattern(model, entry.model_pattern) {
            return compute_cost(
                input_tokens,
                output_tokens,
                entry.input_cost_per_million,
                entry.output_cost_per_million,
            );
        }
    }

    compute_cost(input_tokens, output_tokens, FALLBACK_INPUT_COST, FALLBACK_OUTPUT_COST)
}

fn compute_cost(
    input_tokens: u32,
    output_tokens: u32,
    input_cost_per_million: f64,
    output_cost_per_million: f64,
) -> f64 {
    let input_cost = (input_tokens as f64 / 1_000_000.0) * input_cost_per_million;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * output_cost_per_million;
    input_cost + output_cost
}

/// Format a cost estimate for display, always prefixed with `~`.
///
/// - Below $0.01: three decimal places (`~$0.001`)
/// - Otherwise: two decimal places (`~$0.12`)
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("~${cost:.3}")
    } else {
        format!("~${cost:.2}")
    }
}
