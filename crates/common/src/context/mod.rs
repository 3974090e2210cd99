//! Retrieval and extraction core
//!
//! Pure, synchronous building blocks used by the pipeline:
//! - Keyword extraction and question mode detection
//! - Token-window chunking
//! - Fuzzy document matching
//! - Keyword chunk ranking
//! - Regex fallback extraction
//! - Comparison attribute resolution
//! - Prompt templates

mod attributes;
mod chunker;
mod extractor;
mod fuzzy;
pub mod prompts;
mod query_parser;
mod ranker;

pub use attributes::{AttributeResolver, SynonymTable};
pub use chunker::Chunker;
pub use extractor::{Extraction, ExtractionStrategy, RegexExtractor};
pub use fuzzy::{FuzzyMatcher, DEFAULT_THRESHOLD};
pub use query_parser::{QueryParser, COMPARE_MARKER};
pub use ranker::{ChunkRanker, RankedChunk};
