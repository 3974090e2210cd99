//! Keyword relevance ranking of chunks

use crate::models::Chunk;

/// A chunk with its keyword score
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub score: usize,
}

/// Orders chunks by how many keywords they contain. Pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkRanker;

impl ChunkRanker {
    pub fn new() -> Self {
        Self
    }

    /// +1 per keyword (duplicates counted separately) found in the lowercased text
    pub fn score(&self, text: &str, keywords: &[String]) -> usize {
        let lower = text.to_lowercase();
        keywords
            .iter()
            .filter(|kw| lower.contains(kw.to_lowercase().as_str()))
            .count()
    }

    /// Descending by score; ties keep chunk order
    pub fn rank(&self, chunks: Vec<Chunk>, keywords: &[String]) -> Vec<RankedChunk> {
        let mut ranked: Vec<RankedChunk> = chunks
            .into_iter()
            .map(|chunk| RankedChunk {
                score: self.score(&chunk.text, keywords),
                chunk,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}
