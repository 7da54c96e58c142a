//! Upstream LLM provider adapters.

pub mod anthropic;
pub mod deadline;
pub mod openai_compat;
pub mod pricing;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use cairn_core::llm::SharedProvider;
use cairn_types::config::{ProviderSettings, StreamSettings};
use cairn_types::llm::{LlmError, ProviderKind};

use self::anthropic::AnthropicProvider;
use self::deadline::DeadlineProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Build the configured provider, wrapped in the stream deadline.
///
/// The API key is read from the environment variable named in the
/// provider settings, never from the config file itself.
pub fn build_provider(
    provider: &ProviderSettings,
    stream: &StreamSettings,
) -> Result<SharedProvider, LlmError> {
    let api_key = std::env::var(&provider.api_key_env)
        .map(SecretString::from)
        .map_err(|_| LlmError::MissingApiKey(provider.api_key_env.clone()))?;

    let inner: SharedProvider = match provider.kind {
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(api_key, provider.model.clone());
            if let Some(base_url) = &provider.base_url {
                p = p.with_base_url(base_url);
            }
            Arc::new(p)
        }
        ProviderKind::OpenAiCompatible => Arc::new(OpenAiCompatibleProvider::new(
            api_key,
            provider.model.clone(),
            provider.base_url.as_deref(),
        )),
    };

    Ok(Arc::new(DeadlineProvider::new(
        inner,
        Duration::from_secs(stream.max_stream_secs),
    )))
}
