//! Business logic for the Cairn streaming pipeline.
//!
//! Everything in this crate is written against trait seams so tests
//! can substitute fakes for the ledger, provider, and persistence
//! sink. Concrete implementations live in `cairn-infra`.

pub mod completion;
pub mod context;
pub mod ledger;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod repository;
pub mod scanner;
