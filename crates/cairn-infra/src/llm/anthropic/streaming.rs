//! SSE decoding for the Anthropic Messages API.
//!
//! Normalizes the Anthropic event stream into [`StreamDelta`]s:
//! `message_start` seeds input tokens, `content_block_delta` text
//! becomes `Text`, `message_delta` updates output tokens, and
//! `message_stop` yields the single terminal `Complete`. Malformed
//! individual event payloads are discarded with a warning; only
//! transport errors and explicit `error` events end the stream with
//! a terminal `Failed`.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use cairn_core::llm::DeltaStream;
use cairn_types::llm::{StreamDelta, StreamFailure, Usage};

use super::types::{
    AnthropicRequest, ContentBlockDeltaPayload, AnthropicDelta, ErrorPayload, MessageDeltaPayload,
    MessageStartPayload,
};
use super::API_VERSION;

pub(super) fn open_stream(
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    request: AnthropicRequest,
) -> DeltaStream {
    Box::pin(async_stream::stream! {
        let response = match client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                yield StreamDelta::Failed(StreamFailure::Network(e.to_string()));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            yield StreamDelta::Failed(map_status(status.as_u16()));
            return;
        }

        let mut events = response.bytes_stream().eventsource();
        let mut usage = Usage::default();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield StreamDelta::Failed(StreamFailure::Network(e.to_string()));
                    return;
                }
            };

            match handle_event(&event.event, &event.data, &mut usage) {
                EventAction::Skip => {}
                EventAction::Emit(delta) => yield delta,
                EventAction::Terminal(delta) => {
                    yield delta;
                    return;
                }
            }
        }

        yield StreamDelta::Failed(StreamFailure::Protocol(
            "stream ended without message_stop".to_string(),
        ));
    })
}

/// What the decode loop does with one SSE event.
enum EventAction {
    Skip,
    Emit(StreamDelta),
    Terminal(StreamDelta),
}

/// Decode one named event. A payload that fails to parse is dropped
/// so one garbled line cannot take down an otherwise healthy stream.
fn handle_event(name: &str, data: &str, usage: &mut Usage) -> EventAction {
    match name {
        "message_start" => {
            match serde_json::from_str::<MessageStartPayload>(data) {
                Ok(payload) => {
                    if let Some(start) = payload.message.usage {
                        usage.input_tokens = start.input_tokens;
                    }
                }
                Err(e) => warn!(error = %e, "discarding malformed message_start event"),
            }
            EventAction::Skip
        }
        "content_block_delta" => match serde_json::from_str::<ContentBlockDeltaPayload>(data) {
            Ok(payload) => match payload.delta {
                AnthropicDelta::TextDelta { text } => EventAction::Emit(StreamDelta::Text(text)),
                AnthropicDelta::Other => EventAction::Skip,
            },
            Err(e) => {
                warn!(error = %e, "discarding malformed content_block_delta event");
                EventAction::Skip
            }
        },
        "message_delta" => {
            match serde_json::from_str::<MessageDeltaPayload>(data) {
                Ok(payload) => usage.output_tokens = payload.usage.output_tokens,
                Err(e) => warn!(error = %e, "discarding malformed message_delta event"),
            }
            EventAction::Skip
        }
        "message_stop" => EventAction::Terminal(StreamDelta::Complete(*usage)),
        "error" => {
            let failure = match serde_json::from_str::<ErrorPayload>(data) {
                Ok(payload) => map_error_event(&payload),
                Err(e) => StreamFailure::Protocol(format!("bad error payload: {e}")),
            };
            EventAction::Terminal(StreamDelta::Failed(failure))
        }
        other => {
            // ping, content_block_start/stop: nothing to surface.
            debug!(event = other, "skipping anthropic event");
            EventAction::Skip
        }
    }
}

fn map_status(status: u16) -> StreamFailure {
    match status {
        401 | 403 => StreamFailure::Auth,
        429 => StreamFailure::RateLimited,
        status => StreamFailure::Http { status },
    }
}

fn map_error_event(payload: &ErrorPayload) -> StreamFailure {
    match payload.error.error_type.as_str() {
        "authentication_error" | "permission_error" => StreamFailure::Auth,
        "rate_limit_error" => StreamFailure::RateLimited,
        _ => StreamFailure::Protocol(format!(
            "{}: {}",
            payload.error.error_type, payload.error.message
        )),
    }
}
