//! Query Parser - keyword extraction and mode classification
//!
//! Provides:
//! - Stopword-filtered, order-preserving keywords
//! - Question mode detection (compare / grounded / general)

use crate::models::{Question, QuestionMode};

/// Words carrying no retrieval signal
const STOP_WORDS: &[&str] = &[
    "what", "is", "the", "of", "a", "an", "in", "for", "and", "how", "many", "list", "give",
    "tell", "me", "to", "find", "show", "details", "number",
];

/// Terms naming a structured attribute of a property document
const STRUCTURED_TERMS: &[&str] = &[
    "owner",
    "jantry",
    "market value",
    "distress",
    "file id",
    "area",
    "rate",
    "comparison",
];

/// Literal marker switching a question into compare mode
pub const COMPARE_MARKER: &str = "compare";

/// Parser for user questions
#[derive(Debug, Clone, Default)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a question. Attributes are filled in by the resolver in compare mode.
    pub fn parse(&self, text: &str) -> Question {
        Question {
            raw_text: text.to_string(),
            mode: self.detect_mode(text),
            keywords: self.extract_keywords(text),
            attributes: Vec::new(),
        }
    }

    /// Lowercased word tokens, minus stopwords and tokens of two characters or fewer.
    /// Order and duplicates are kept.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() > 2)
            .filter(|token| !STOP_WORDS.contains(token))
            .map(str::to_string)
            .collect()
    }

    /// Select the prompt template for a question
    pub fn detect_mode(&self, text: &str) -> QuestionMode {
        let lower = text.to_lowercase();

        if lower.contains(COMPARE_MARKER) {
            return QuestionMode::Compare;
        }

        if STRUCTURED_TERMS.iter().any(|term| lower.contains(term)) {
            QuestionMode::Grounded
        } else {
            QuestionMode::General
        }
    }

    /// A query made only of digits is a file id
    pub fn is_numeric_id(&self, query: &str) -> bool {
        let trimmed = query.trim();
        !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_drop_stopwords_and_short_tokens() {
        let parser = QueryParser::new();
        let keywords = parser.extract_keywords("What is the jantry value of the plot?");
        assert_eq!(keywords, vec!["jantry", "value", "plot"]);
    }

    #[test]
    fn test_keywords_keep_order_and_duplicates() {
        let parser = QueryParser::new();
        let keywords = parser.extract_keywords("rate rate area");
        assert_eq!(keywords, vec!["rate", "rate", "area"]);
    }

    #[test]
    fn test_empty_question_has_no_keywords() {
        let parser = QueryParser::new();
        assert!(parser.extract_keywords("").is_empty());
        assert!(parser.extract_keywords("   ?!").is_empty());
    }

    #[test]
    fn test_compare_mode() {
        let parser = QueryParser::new();
        assert_eq!(
            parser.detect_mode("Compare owner and jantry value"),
            QuestionMode::Compare
        );
    }

    #[test]
    fn test_grounded_mode() {
        let parser = QueryParser::new();
        assert_eq!(parser.detect_mode("who is the owner"), QuestionMode::Grounded);
        assert_eq!(parser.detect_mode("Market Value?"), QuestionMode::Grounded);
    }

    #[test]
    fn test_general_mode() {
        let parser = QueryParser::new();
        assert_eq!(
            parser.detect_mode("summarise this document"),
            QuestionMode::General
        );
    }

    #[test]
    fn test_numeric_id() {
        let parser = QueryParser::new();
        assert!(parser.is_numeric_id(" 10784 "));
        assert!(!parser.is_numeric_id("plot 12"));
        assert!(!parser.is_numeric_id(""));
    }
}
