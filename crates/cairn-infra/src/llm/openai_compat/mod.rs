//! OpenAI-compatible streaming provider.
//!
//! One adapter covers any API speaking the OpenAI chat-completions
//! protocol (OpenAI itself, local inference servers, gateways) via a
//! configurable base URL. Uses [`async_openai`] for request types and
//! built-in SSE streaming, normalized here into the single
//! terminal-delta contract of [`StreamDelta`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest,
};
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use cairn_core::llm::{DeltaStream, StreamingProvider};
use cairn_types::llm::{
    ChatTurn, CompletionRequest, MessageRole, StreamDelta, StreamFailure, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Streaming client for any OpenAI-compatible chat-completions API.
///
/// No `Debug` derive: the API key lives inside the `async_openai`
/// client and must never reach log output.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>, base_url: Option<&str>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url.unwrap_or(DEFAULT_BASE_URL));

        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    fn build_request(&self, request: CompletionRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(system) = request.system {
            messages.push(system_message(system));
        }
        for turn in request.messages {
            messages.push(turn_message(turn));
        }

        CreateChatCompletionRequest {
            model: request.model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            stream: Some(true),
            stream_options: Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            }),
            ..Default::default()
        }
    }
}

fn system_message(content: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content),
        name: None,
    })
}

fn turn_message(turn: ChatTurn) -> ChatCompletionRequestMessage {
    match turn.role {
        MessageRole::System => system_message(turn.content),
        MessageRole::User => {
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(turn.content),
                name: None,
            })
        }
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    turn.content,
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

fn map_openai_error(e: OpenAIError) -> StreamFailure {
    match e {
        OpenAIError::Reqwest(inner) => StreamFailure::Network(inner.to_string()),
        OpenAIError::ApiError(api) => match api.code.as_deref() {
            Some("invalid_api_key") => StreamFailure::Auth,
            Some("rate_limit_exceeded") => StreamFailure::RateLimited,
            _ => StreamFailure::Protocol(api.message),
        },
        other => StreamFailure::Protocol(other.to_string()),
    }
}

impl StreamingProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: CompletionRequest) -> DeltaStream {
        let wire = self.build_request(request);
        let client = self.client.clone();

        Box::pin(async_stream::stream! {
            let mut chunks = match client.chat().create_stream(wire).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    yield StreamDelta::Failed(map_openai_error(e));
                    return;
                }
            };

            let mut usage = Usage::default();
            let mut finished = false;

            while let Some(result) = chunks.next().await {
                let chunk = match result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield StreamDelta::Failed(map_openai_error(e));
                        return;
                    }
                };

                // With include_usage the final chunk carries usage and
                // an empty choices array.
                if let Some(reported) = &chunk.usage {
                    usage.input_tokens = reported.prompt_tokens;
                    usage.output_tokens = reported.completion_tokens;
                }

                for choice in &chunk.choices {
                    if let Some(text) = &choice.delta.content {
                        if !text.is_empty() {
                            yield StreamDelta::Text(text.clone());
                        }
                    }
                    if choice.finish_reason.is_some() {
                        finished = true;
                    }
                }
            }

            if finished {
                yield StreamDelta::Complete(usage);
            } else {
                yield StreamDelta::Failed(StreamFailure::Protocol(
                    "stream ended without a finish reason".to_string(),
                ));
            }
        })
    }
}
