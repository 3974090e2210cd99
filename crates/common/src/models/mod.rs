//! Domain types shared by the pipeline, the store and the HTTP layer

use serde::{Deserialize, Serialize};

/// Value reported when nothing could be extracted for a question or attribute
pub const SENTINEL: &str = "Not mentioned.";

/// A property document as held by the store. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(alias = "file_id")]
    pub id: String,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// A token window over a document body, derived per request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_document_id: String,
    pub sequence_index: usize,
}

/// A document selected by fuzzy matching, with its 0-100 score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub document: Document,
    pub score: f64,
}

/// How a question is answered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMode {
    /// One column per requested attribute, one row per document
    Compare,
    /// Open-ended question, no structured attribute named
    General,
    /// Question about a known structured attribute; answer only from the text
    Grounded,
}

impl QuestionMode {
    pub fn is_compare(&self) -> bool {
        matches!(self, QuestionMode::Compare)
    }
}

/// A parsed question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub raw_text: String,
    pub mode: QuestionMode,
    pub keywords: Vec<String>,
    /// Resolved attributes, compare mode only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ResolvedAttribute>,
}

/// A canonical attribute and the phrases that map to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub canonical_name: String,
    pub synonyms: Vec<String>,
}

/// A canonical attribute paired with the first raw phrase that produced it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub canonical: String,
    pub phrase: String,
}

/// Where an answer value came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Generated,
    Extracted,
    None,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Generated => "generated",
            AnswerSource::Extracted => "extracted",
            AnswerSource::None => "none",
        }
    }
}

/// The answer for one document (and one attribute in compare mode)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub value: String,
    pub source: AnswerSource,
}

impl AnswerResult {
    pub fn not_mentioned(document_id: impl Into<String>, attribute: Option<String>) -> Self {
        Self {
            document_id: document_id.into(),
            attribute,
            value: SENTINEL.to_string(),
            source: AnswerSource::None,
        }
    }
}

/// One row of a comparison table. `cells[i]` belongs to `attributes[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub document_id: String,
    pub property_name: String,
    pub cells: Vec<AnswerResult>,
}

/// Documents × attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub attributes: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ComparisonTable {
    /// Every row has exactly one cell per attribute
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.cells.len() == self.attributes.len())
    }
}
