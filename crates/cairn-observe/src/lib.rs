//! Tracing initialization for cairn binaries.

pub mod tracing_setup;
