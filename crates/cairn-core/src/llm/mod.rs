//! Provider-agnostic streaming completion seam.

pub mod provider;

pub use provider::{DeltaStream, SharedProvider, StreamingProvider};
