//! Request-scoped context assembly.

pub mod assembler;
pub mod summarizer;

pub use assembler::ContextAssembler;
