//! Hard wall-clock cap on upstream streams.
//!
//! [`DeadlineStream`] wraps a provider delta stream and injects a
//! single terminal `Failed(Timeout)` if the stream is still running
//! when the deadline passes, regardless of whether individual chunks
//! were arriving on time. After any terminal delta, own or injected,
//! the stream ends.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use pin_project_lite::pin_project;

use cairn_core::llm::{DeltaStream, SharedProvider, StreamingProvider};
use cairn_types::llm::{CompletionRequest, StreamDelta, StreamFailure};

pin_project! {
    /// Delta stream with a total-duration cap.
    pub struct DeadlineStream {
        inner: DeltaStream,
        #[pin]
        deadline: tokio::time::Sleep,
        done: bool,
    }
}

impl DeadlineStream {
    pub fn new(inner: DeltaStream, max_duration: Duration) -> Self {
        Self {
            inner,
            deadline: tokio::time::sleep(max_duration),
            done: false,
        }
    }
}

impl Stream for DeadlineStream {
    type Item = StreamDelta;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamDelta>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        if this.deadline.poll(cx).is_ready() {
            *this.done = true;
            return Poll::Ready(Some(StreamDelta::Failed(StreamFailure::Timeout)));
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(delta)) => {
                if matches!(delta, StreamDelta::Complete(_) | StreamDelta::Failed(_)) {
                    *this.done = true;
                }
                Poll::Ready(Some(delta))
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Provider wrapper applying the deadline to every opened stream.
pub struct DeadlineProvider {
    inner: SharedProvider,
    max_duration: Duration,
}

impl DeadlineProvider {
    pub fn new(inner: SharedProvider, max_duration: Duration) -> Self {
        Self {
            inner,
            max_duration,
        }
    }
}

impl StreamingProvider for DeadlineProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn stream(&self, request: CompletionRequest) -> DeltaStream {
        Box::pin(DeadlineStream::new(
            self.inner.stream(request),
            self.max_duration,
        ))
    }
}
