//! Global configuration schema (`config.toml` in the data dir).

use serde::{Deserialize, Serialize};

use crate::llm::ProviderKind;

/// Top-level configuration, deserialized from `config.toml`.
///
/// Every field has a default so a missing or partial file still
/// yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    /// Per-model pricing overrides, USD per million tokens.
    #[serde(default)]
    pub pricing: Vec<PricingOverride>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            limits: LimitSettings::default(),
            stream: StreamSettings::default(),
            pricing: Vec::new(),
        }
    }
}

/// Upstream LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Override the provider base URL (proxies, test servers).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Per-tier message limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// Lifetime trial allowance.
    #[serde(default = "default_trial_messages")]
    pub trial_messages: u32,
    /// Monthly allowance for paying users.
    #[serde(default = "default_monthly_messages")]
    pub monthly_messages: u32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            trial_messages: default_trial_messages(),
            monthly_messages: default_monthly_messages(),
        }
    }
}

/// Streaming pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Hard cap on total upstream stream duration, seconds.
    #[serde(default = "default_max_stream_secs")]
    pub max_stream_secs: u64,
    /// Per-fetch budget for context assembly, milliseconds.
    #[serde(default = "default_context_budget_ms")]
    pub context_budget_ms: u64,
    /// Token budget for the prior-conversations prompt section.
    #[serde(default = "default_history_token_budget")]
    pub history_token_budget: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_stream_secs: default_max_stream_secs(),
            context_budget_ms: default_context_budget_ms(),
            history_token_budget: default_history_token_budget(),
        }
    }
}

/// Pricing override for one model, USD per million tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverride {
    pub model_pattern: String,
    pub input_cost_per_million: f64,
    pub output_cost_per_million: f64,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_key_env() -> String {
    "CAIRN_PROVIDER_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f64 {
    0.7
}

fn default_trial_messages() -> u32 {
    100
}

fn default_monthly_messages() -> u32 {
    1500
}

fn default_max_stream_secs() -> u64 {
    30
}

fn default_context_budget_ms() -> u64 {
    200
}

fn default_history_token_budget() -> u32 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Anthropic);
        assert_eq!(config.limits.trial_messages, 100);
        assert_eq!(config.stream.max_stream_secs, 30);
        assert!(config.pricing.is_empty());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: GlobalConfig = toml::from_str(
            r#"
[limits]
trial_messages = 25

[provider]
kind = "openai_compatible"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        assert_eq!(config.limits.trial_messages, 25);
        assert_eq!(config.limits.monthly_messages, 1500);
        assert_eq!(config.provider.kind, ProviderKind::OpenAiCompatible);
        assert_eq!(config.stream.context_budget_ms, 200);
    }
}
