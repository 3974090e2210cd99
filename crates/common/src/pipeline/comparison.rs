//! Cross-document attribute comparison

use crate::context::{prompts, ChunkRanker, Chunker, QueryParser, RegexExtractor};
use crate::llm::AnswerChain;
use crate::metrics;
use crate::models::{
    AnswerResult, AnswerSource, ComparisonRow, ComparisonTable, Document, ResolvedAttribute,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds a documents × attributes table, one chain call per cell
#[derive(Clone)]
pub struct ComparisonAggregator {
    chain: Arc<AnswerChain>,
    chunker: Chunker,
    parser: QueryParser,
    ranker: ChunkRanker,
    extractor: RegexExtractor,
    warn_threshold: usize,
}

impl ComparisonAggregator {
    pub fn new(chain: Arc<AnswerChain>, chunker: Chunker, warn_threshold: usize) -> Self {
        Self {
            chain,
            chunker,
            parser: QueryParser::new(),
            ranker: ChunkRanker::new(),
            extractor: RegexExtractor::new(),
            warn_threshold,
        }
    }

    /// Rows are created up front and get exactly one cell per attribute pass
    pub async fn compare(
        &self,
        attributes: &[ResolvedAttribute],
        documents: &[Document],
    ) -> ComparisonTable {
        let mut table = ComparisonTable {
            attributes: attributes.iter().map(|a| a.canonical.clone()).collect(),
            rows: documents
                .iter()
                .map(|doc| ComparisonRow {
                    document_id: doc.id.clone(),
                    property_name: doc.property_name.clone(),
                    cells: Vec::with_capacity(attributes.len()),
                })
                .collect(),
            warnings: Vec::new(),
        };

        if documents.len() > self.warn_threshold {
            let message = format!(
                "Comparing {} documents may take longer than usual",
                documents.len()
            );
            warn!(documents = documents.len(), threshold = self.warn_threshold, "{}", message);
            table.warnings.push(message);
        }

        for attribute in attributes {
            let keywords = self.parser.extract_keywords(&attribute.phrase);
            for (doc, row) in documents.iter().zip(table.rows.iter_mut()) {
                let cell = self.cell(attribute, &keywords, doc).await;
                metrics::record_answer(cell.source.as_str(), "compare");
                row.cells.push(cell);
            }
        }

        table
    }

    async fn cell(
        &self,
        attribute: &ResolvedAttribute,
        keywords: &[String],
        doc: &Document,
    ) -> AnswerResult {
        let chunks = self.chunker.chunk(&doc.content, &doc.id);
        let top = self.ranker.rank(chunks, keywords).into_iter().next();

        if let Some(top) = top {
            let prompt = prompts::extraction_prompt(&attribute.phrase, &top.chunk.text);
            let answer = self.chain.generate(&prompt).await;

            let parsed = if answer.is_exhausted() {
                None
            } else {
                prompts::parse_answer_line(&answer.text)
            };

            if let Some(value) = parsed {
                return AnswerResult {
                    document_id: doc.id.clone(),
                    attribute: Some(attribute.canonical.clone()),
                    value,
                    source: AnswerSource::Generated,
                };
            }
            debug!(
                document_id = %doc.id,
                attribute = %attribute.canonical,
                "No parsable answer, using regex extraction"
            );
        }

        match self.extractor.extract_attribute(&doc.content, &attribute.phrase) {
            Some(found) => {
                metrics::record_extraction(found.strategy.as_str());
                AnswerResult {
                    document_id: doc.id.clone(),
                    attribute: Some(attribute.canonical.clone()),
                    value: found.value,
                    source: AnswerSource::Extracted,
                }
            }
            None => AnswerResult::not_mentioned(doc.id.clone(), Some(attribute.canonical.clone())),
        }
    }
}
