//! Anthropic Messages API provider.

mod streaming;
mod types;

use secrecy::SecretString;

use cairn_core::llm::{DeltaStream, StreamingProvider};
use cairn_types::llm::CompletionRequest;

use types::{AnthropicMessage, AnthropicRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Streaming client for the Anthropic Messages API.
///
/// No `Debug` derive: the API key must never reach log output.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Point at a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn to_wire(&self, request: CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            messages: request
                .messages
                .into_iter()
                .map(|turn| AnthropicMessage {
                    role: turn.role.to_string(),
                    content: turn.content,
                })
                .collect(),
            system: request.system,
            stream: true,
            temperature: request.temperature,
        }
    }
}

impl StreamingProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: CompletionRequest) -> DeltaStream {
        let url = format!("{}/v1/messages", self.base_url);
        streaming::open_stream(
            self.client.clone(),
            url,
            self.api_key.clone(),
            self.to_wire(request),
        )
    }
}
