#![recursion_limit = "256"]
/// Core library for the Newsroom editorial pipeline.
///
/// This crate contains all business logic: configuration management,
/// the LLM gateway, the deduplication engine, the analysis stages,
/// content assembly, publishing, and the pipeline orchestrator used
/// by the CLI binary.
pub mod assemble;
pub mod config;
pub mod dedup;
pub mod embedding;
pub mod error;
pub mod fsutil;
pub mod llm;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod search;
pub mod social;
pub mod stages;
pub mod tts;

pub use error::*;

/// Returns the version of the newsroom-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
