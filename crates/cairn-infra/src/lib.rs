//! Infrastructure layer for Cairn.
//!
//! Contains implementations of the trait seams defined in
//! `cairn-core`: SQLite storage (repositories, usage ledger,
//! completion sink) and streaming LLM provider adapters.

pub mod config;
pub mod llm;
pub mod sqlite;
