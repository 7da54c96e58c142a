//! Provider-agnostic LLM request and streaming delta types.
//!
//! Every upstream wire protocol (Anthropic SSE, OpenAI-compatible
//! chunk streams) is normalized into [`StreamDelta`]: an ordered
//! sequence of text deltas terminated by exactly one `Complete` or
//! `Failed` delta. Everything downstream of a provider adapter is
//! written against this one shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single turn in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider for a streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Token usage reported by a provider at stream end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// One normalized unit from an upstream streaming completion.
///
/// A well-formed stream is zero or more `Text` deltas followed by
/// exactly one `Complete` or `Failed`. Adapters must never emit
/// anything after the terminal delta.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    /// Incremental generated text.
    Text(String),
    /// Natural end of stream with final usage accounting.
    Complete(Usage),
    /// The stream ended abnormally; no further deltas follow.
    Failed(StreamFailure),
}

/// Why an upstream stream ended abnormally.
///
/// This detail is for server-side logs only. The client sees a single
/// constant, user-safe error message regardless of the variant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamFailure {
    #[error("stream exceeded the maximum allowed duration")]
    Timeout,
    #[error("upstream HTTP error (status {status})")]
    Http { status: u16 },
    #[error("upstream authentication failed")]
    Auth,
    #[error("upstream rate limited")]
    RateLimited,
    #[error("malformed upstream response: {0}")]
    Protocol(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Errors constructing or dispatching a provider request.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("missing API key (expected in env var {0})")]
    MissingApiKey(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Type of LLM provider backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai_compatible" => Ok(ProviderKind::OpenAiCompatible),
            other => Err(format!("invalid provider kind: '{other}'")),
        }
    }
}
