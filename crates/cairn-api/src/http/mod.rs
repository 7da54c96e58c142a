//! HTTP surface: router, handlers, auth extractor, error envelope.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
