//! Text chunking
//!
//! Splits a document body into overlapping windows of whitespace tokens.

use crate::config::ChunkingConfig;
use crate::errors::{AppError, Result};
use crate::models::Chunk;
use tracing::debug;

/// Sliding-window chunker over whitespace tokens
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_tokens: usize,
    overlap: usize,
}

impl Chunker {
    /// Fails when the window cannot advance
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self> {
        if max_tokens == 0 || overlap >= max_tokens {
            return Err(AppError::InvalidChunking { max_tokens, overlap });
        }
        Ok(Self { max_tokens, overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.max_tokens, config.overlap)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Windows of `max_tokens` tokens starting every `max_tokens - overlap` tokens.
    /// The last window may be shorter.
    pub fn chunk(&self, text: &str, document_id: &str) -> Vec<Chunk> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let total = tokens.len();
        let step = self.max_tokens - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.max_tokens).min(total);
            chunks.push(Chunk {
                text: tokens[start..end].join(" "),
                source_document_id: document_id.to_string(),
                sequence_index: chunks.len(),
            });

            if end == total {
                break;
            }
            start += step;
        }

        debug!(
            document_id = %document_id,
            token_count = total,
            chunk_count = chunks.len(),
            max_tokens = self.max_tokens,
            overlap = self.overlap,
            "Document chunked"
        );

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            overlap: 200,
        }
    }
}
