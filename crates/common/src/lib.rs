//! DeedLens Common Library
//!
//! Shared code for the DeedLens services including:
//! - Domain models for documents, matches, answers and comparison tables
//! - Retrieval core: keywords, chunking, fuzzy matching, ranking, extraction
//! - Generation backends and the ordered fallback chain
//! - Audit sinks
//! - Document stores (JSON file, MySQL)
//! - The question answering pipeline
//! - Error types, configuration, metrics

pub mod audit;
pub mod config;
pub mod context;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::{AnswerChain, GenerationBackend};
pub use pipeline::{QueryOutcome, QueryService};
pub use store::DocumentStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
