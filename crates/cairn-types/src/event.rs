//! Outbound stream event vocabulary.
//!
//! Line-oriented wire contract between the pipeline and clients.
//! Every event is one JSON object carried in an SSE `data:` field:
//!
//! ```json
//! {"type":"token","content":"...","memory_moment":false,"pattern_insight":false}
//! {"type":"done","messageId":"...","usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}
//! {"type":"error","message":"..."}
//! ```
//!
//! `done` is always the last event of a successful stream; nothing
//! follows `error`.

use serde::{Deserialize, Serialize};

use crate::llm::Usage;

/// Constant, user-safe message for every mid-stream failure. Upstream
/// technical detail stays in server logs only.
pub const STREAM_ERROR_MESSAGE: &str =
    "Something went wrong while responding. Please try again.";

/// Usage block of a `done` event, in wire field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Usage> for WireUsage {
    fn from(u: Usage) -> Self {
        Self {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.total(),
        }
    }
}

/// One event on the outbound stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Token {
        content: String,
        memory_moment: bool,
        pattern_insight: bool,
    },
    Done {
        #[serde(rename = "messageId")]
        message_id: String,
        usage: WireUsage,
    },
    Error {
        message: String,
    },
}

impl ChatEvent {
    pub fn error() -> Self {
        ChatEvent::Error {
            message: STREAM_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done { .. } | ChatEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_event_wire_shape() {
        let event = ChatEvent::Token {
            content: "hi".to_string(),
            memory_moment: true,
            pattern_insight: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"token","content":"hi","memory_moment":true,"pattern_insight":false}"#
        );
    }

    #[test]
    fn done_event_wire_shape() {
        let event = ChatEvent::Done {
            message_id: "m1".to_string(),
            usage: WireUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""messageId":"m1""#));
        assert!(json.contains(r#""total_tokens":15"#));
    }

    #[test]
    fn error_event_uses_constant_message() {
        let event = ChatEvent::error();
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChatEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            ChatEvent::Error { message } => assert_eq!(message, STREAM_ERROR_MESSAGE),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[test]
    fn wire_usage_from_usage() {
        let wire: WireUsage = Usage {
            input_tokens: 7,
            output_tokens: 3,
        }
        .into();
        assert_eq!(wire.prompt_tokens, 7);
        assert_eq!(wire.completion_tokens, 3);
        assert_eq!(wire.total_tokens, 10);
    }
}
