//! Shared domain types for Cairn.
//!
//! This crate holds the serde data shapes and error enums used across
//! the workspace: LLM request/delta types, chat messages, usage
//! metering, context bundles, tag-scan results, and the outbound
//! stream event vocabulary. No I/O lives here.

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod llm;
pub mod scan;
pub mod usage;
