//! StreamingProvider trait definition.
//!
//! Every upstream completion API is adapted to this one shape so the
//! pipeline is provider-agnostic: adding a provider means writing one
//! adapter in `cairn-infra`, not touching the orchestration state
//! machine.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use cairn_types::llm::{CompletionRequest, StreamDelta};

/// Ordered stream of normalized deltas from one completion call.
///
/// A well-formed stream yields zero or more `Text` deltas followed by
/// exactly one `Complete` or `Failed`, then ends.
pub type DeltaStream = Pin<Box<dyn Stream<Item = StreamDelta> + Send + 'static>>;

/// An upstream streaming completion backend.
///
/// The trait is object-safe (the stream is already boxed), so
/// runtime provider selection is just `Arc<dyn StreamingProvider>`.
/// Errors are not a second channel: any failure surfaces as a single
/// terminal [`StreamDelta::Failed`] on the stream itself.
pub trait StreamingProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Default model identifier for this provider instance.
    fn model(&self) -> &str;

    /// Open a streaming completion. Never retries within the same
    /// logical request; retry policy belongs to callers.
    fn stream(&self, request: CompletionRequest) -> DeltaStream;
}

/// Shared, type-erased provider handle for injection.
pub type SharedProvider = Arc<dyn StreamingProvider>;
