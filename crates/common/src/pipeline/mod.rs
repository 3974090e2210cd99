//! Question answering pipeline
//!
//! Selection, then a per-document loop, then a per-chunk loop. Everything
//! runs sequentially; the only awaits are store reads and chain calls.
//! Generation and extraction failures never surface as errors; store
//! failures do.

mod comparison;

pub use comparison::ComparisonAggregator;

use crate::config::AppConfig;
use crate::context::{
    prompts, AttributeResolver, ChunkRanker, Chunker, FuzzyMatcher, QueryParser, RegexExtractor,
    SynonymTable,
};
use crate::errors::Result;
use crate::llm::AnswerChain;
use crate::metrics;
use crate::models::{
    AnswerResult, AnswerSource, ComparisonTable, Document, Match, Question, QuestionMode,
};
use crate::store::DocumentStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Score given to a document found by exact id
const EXACT_MATCH_SCORE: f64 = 100.0;

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub threshold: f64,
    pub keyword_search_limit: usize,
    pub max_chunk_attempts: Option<usize>,
    pub compare_warn_threshold: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            threshold: config.matching.threshold,
            keyword_search_limit: config.matching.keyword_search_limit,
            max_chunk_attempts: config.pipeline.max_chunk_attempts,
            compare_warn_threshold: config.pipeline.compare_warn_threshold,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of answering a question over a set of documents
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// One answer per document
    Answers { answers: Vec<AnswerResult> },
    /// One row per document, one column per attribute
    Comparison { table: ComparisonTable },
}

/// Entry point for matching documents and answering questions
pub struct QueryService {
    store: Arc<dyn DocumentStore>,
    chain: Arc<AnswerChain>,
    parser: QueryParser,
    matcher: FuzzyMatcher,
    chunker: Chunker,
    ranker: ChunkRanker,
    extractor: RegexExtractor,
    resolver: AttributeResolver,
    aggregator: ComparisonAggregator,
    settings: PipelineSettings,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        chain: Arc<AnswerChain>,
        resolver: AttributeResolver,
        chunker: Chunker,
        settings: PipelineSettings,
    ) -> Self {
        let aggregator =
            ComparisonAggregator::new(Arc::clone(&chain), chunker, settings.compare_warn_threshold);
        Self {
            store,
            chain,
            parser: QueryParser::new(),
            matcher: FuzzyMatcher::new(),
            chunker,
            ranker: ChunkRanker::new(),
            extractor: RegexExtractor::new(),
            resolver,
            aggregator,
            settings,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        chain: Arc<AnswerChain>,
    ) -> Result<Self> {
        Ok(Self::new(
            store,
            chain,
            AttributeResolver::new(SynonymTable::from_entries(&config.synonyms)),
            Chunker::from_config(&config.chunking)?,
            PipelineSettings::from_config(config),
        ))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn chain(&self) -> &Arc<AnswerChain> {
        &self.chain
    }

    /// Documents matching a free-text query, best first.
    ///
    /// A digits-only query is a file id. Otherwise property and owner names
    /// are fuzzy matched, and when nothing clears the threshold the store's
    /// owner-name search is tried.
    #[instrument(skip(self))]
    pub async fn find_documents(&self, query: &str) -> Result<Vec<Match>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        if self.parser.is_numeric_id(query) {
            let found: Vec<Match> = self
                .store
                .find_by_id(query)
                .await?
                .into_iter()
                .map(|document| Match {
                    document,
                    score: EXACT_MATCH_SCORE,
                })
                .collect();
            metrics::record_documents_matched("id", found.len());
            return Ok(found);
        }

        let candidates = self.store.find_all_for_fuzzy_scan().await?;
        let matches = self.matcher.rank(query, &candidates, self.settings.threshold);
        debug!(
            candidates = candidates.len(),
            matches = matches.len(),
            "Fuzzy scan complete"
        );
        if !matches.is_empty() {
            metrics::record_documents_matched("fuzzy", matches.len());
            return Ok(matches);
        }

        let by_owner: Vec<Match> = self
            .store
            .find_by_owner_name(query)
            .await?
            .into_iter()
            .map(|document| Match {
                score: self.matcher.score_document(query, &document),
                document,
            })
            .collect();
        metrics::record_documents_matched("owner", by_owner.len());
        Ok(by_owner)
    }

    /// Documents a question should run against.
    ///
    /// With a query, its matches (narrowed to `ids` when given). Without one,
    /// the documents named by `ids`, or else a keyword search over the
    /// question.
    pub async fn select_documents(
        &self,
        query: Option<&str>,
        ids: &[String],
        question: &str,
    ) -> Result<Vec<Document>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let matches = self.find_documents(query).await?;
                Ok(matches
                    .into_iter()
                    .map(|m| m.document)
                    .filter(|doc| ids.is_empty() || ids.contains(&doc.id))
                    .collect())
            }
            None if !ids.is_empty() => self.store.find_by_ids(ids).await,
            None => {
                let keywords = self.parser.extract_keywords(question);
                let found = self
                    .store
                    .find_by_keywords(&keywords, self.settings.keyword_search_limit)
                    .await?;
                metrics::record_documents_matched("keyword", found.len());
                Ok(found)
            }
        }
    }

    /// Keywords, mode and, for comparisons, the resolved attributes
    pub fn parse_question(&self, text: &str) -> Question {
        let mut question = self.parser.parse(text);
        if question.mode.is_compare() {
            question.attributes = self.resolver.resolve_phrases(text);
        }
        question
    }

    /// Answer a question over the given documents. Never fails.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn ask(&self, question: &str, documents: &[Document]) -> QueryOutcome {
        let question = self.parse_question(question);
        info!(
            mode = ?question.mode,
            keywords = ?question.keywords,
            "Answering question"
        );

        if question.mode.is_compare() {
            let table = self.aggregator.compare(&question.attributes, documents).await;
            return QueryOutcome::Comparison { table };
        }

        let mut answers = Vec::with_capacity(documents.len());
        for doc in documents {
            let answer = self.answer_document(&question, doc).await;
            metrics::record_answer(answer.source.as_str(), mode_label(&question));
            answers.push(answer);
        }
        QueryOutcome::Answers { answers }
    }

    /// Ranked chunks in order until one answer is accepted, then regex
    /// extraction over the whole document.
    async fn answer_document(&self, question: &Question, doc: &Document) -> AnswerResult {
        let chunks = self.chunker.chunk(&doc.content, &doc.id);
        let ranked = self.ranker.rank(chunks, &question.keywords);
        let attempts = self
            .settings
            .max_chunk_attempts
            .map_or(ranked.len(), |max| max.min(ranked.len()));

        for candidate in ranked.iter().take(attempts) {
            let prompt =
                prompts::question_prompt(question.mode, &candidate.chunk.text, &question.raw_text);
            let answer = self.chain.generate(&prompt).await;

            if !answer.is_exhausted() && prompts::is_acceptable(&answer.text) {
                return AnswerResult {
                    document_id: doc.id.clone(),
                    attribute: None,
                    value: answer.text.trim().to_string(),
                    source: AnswerSource::Generated,
                };
            }
            debug!(
                document_id = %doc.id,
                chunk = candidate.chunk.sequence_index,
                exhausted = answer.is_exhausted(),
                "Answer rejected, trying next chunk"
            );
        }

        match self.extractor.try_extract(&doc.content, &question.keywords) {
            Some(found) => {
                metrics::record_extraction(found.strategy.as_str());
                AnswerResult {
                    document_id: doc.id.clone(),
                    attribute: None,
                    value: found.value,
                    source: AnswerSource::Extracted,
                }
            }
            None => AnswerResult::not_mentioned(doc.id.clone(), None),
        }
    }
}

fn mode_label(question: &Question) -> &'static str {
    match question.mode {
        QuestionMode::Compare => "compare",
        QuestionMode::General => "general",
        QuestionMode::Grounded => "grounded",
    }
}
