//! Attribute resolution for comparison questions

use crate::config::SynonymEntry;
use crate::context::query_parser::COMPARE_MARKER;
use crate::models::{Attribute, ResolvedAttribute};
use regex::Regex;
use std::sync::OnceLock;

fn phrase_separator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\band\b|,").expect("separator pattern is valid"))
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b{}\b", COMPARE_MARKER)).expect("marker pattern is valid")
    })
}

/// Ordered phrase → canonical attribute mapping. Built once, read-only.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: Vec<(String, String)>,
}

impl SynonymTable {
    pub fn from_entries(entries: &[SynonymEntry]) -> Self {
        Self::from_pairs(entries.iter().map(|e| (e.phrase.as_str(), e.canonical.as_str())))
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(phrase, canonical)| (phrase.trim().to_lowercase(), canonical.to_string()))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact phrase first, then the first entry contained in the phrase
    pub fn lookup(&self, phrase: &str) -> Option<&str> {
        let phrase = phrase.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| *key == phrase)
            .or_else(|| self.entries.iter().find(|(key, _)| phrase.contains(key.as_str())))
            .map(|(_, canonical)| canonical.as_str())
    }

    /// Canonical attributes with their synonyms, in first-seen order
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut attributes: Vec<Attribute> = Vec::new();
        for (phrase, canonical) in &self.entries {
            match attributes.iter_mut().find(|a| a.canonical_name == *canonical) {
                Some(attr) => attr.synonyms.push(phrase.clone()),
                None => attributes.push(Attribute {
                    canonical_name: canonical.clone(),
                    synonyms: vec![phrase.clone()],
                }),
            }
        }
        attributes
    }
}

/// Turns a comparison question into an ordered list of attributes
#[derive(Debug, Clone)]
pub struct AttributeResolver {
    table: SynonymTable,
}

impl AttributeResolver {
    pub fn new(table: SynonymTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SynonymTable {
        &self.table
    }

    /// Canonical names only
    pub fn resolve(&self, question: &str) -> Vec<String> {
        self.resolve_phrases(question)
            .into_iter()
            .map(|a| a.canonical)
            .collect()
    }

    /// Canonical names paired with the first phrase that produced each.
    /// Order of first appearance, no repeats.
    pub fn resolve_phrases(&self, question: &str) -> Vec<ResolvedAttribute> {
        let without_marker = strip_marker(question);
        let mut resolved: Vec<ResolvedAttribute> = Vec::new();

        for raw in phrase_separator().split(&without_marker) {
            let phrase = raw
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '.' | '!'))
                .to_lowercase();
            if phrase.is_empty() {
                continue;
            }

            let canonical = self
                .table
                .lookup(&phrase)
                .map(str::to_string)
                .unwrap_or_else(|| phrase.clone());

            if !resolved.iter().any(|r| r.canonical == canonical) {
                resolved.push(ResolvedAttribute { canonical, phrase });
            }
        }

        resolved
    }
}

/// Drop the standalone compare marker and collapse the leftover whitespace.
/// Words that merely contain it ("compared") are kept.
fn strip_marker(question: &str) -> String {
    marker_pattern()
        .replace_all(question, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> AttributeResolver {
        AttributeResolver::new(SynonymTable::from_pairs([
            ("jantry value", "jantry_rate"),
            ("jantry rate", "jantry_rate"),
            ("market value", "market_value"),
            ("value", "generic_value"),
        ]))
    }

    #[test]
    fn test_resolve_owner_and_jantry() {
        assert_eq!(
            resolver().resolve("compare owner and jantry value"),
            vec!["owner", "jantry_rate"]
        );
    }

    #[test]
    fn test_repeats_collapse() {
        assert_eq!(
            resolver().resolve("Compare Jantry Rate, owner and jantry value?"),
            vec!["jantry_rate", "owner"]
        );
    }

    #[test]
    fn test_first_contained_entry_wins() {
        assert_eq!(
            resolver().resolve("compare current market value"),
            vec!["market_value"]
        );
    }

    #[test]
    fn test_and_inside_words_is_not_a_separator() {
        assert_eq!(resolver().resolve("compare land area"), vec!["land area"]);
    }

    #[test]
    fn test_marker_inside_words_is_kept() {
        assert_eq!(
            resolver().resolve("compare area compared to rate"),
            vec!["area compared to rate"]
        );
        assert_eq!(strip_marker("COMPARE  owner,  comparesion"), "owner, comparesion");
    }

    #[test]
    fn test_empty_phrases_dropped() {
        assert!(resolver().resolve("compare , and ?").is_empty());
    }

    #[test]
    fn test_phrase_is_kept_for_fallback() {
        let resolved = resolver().resolve_phrases("compare jantry value");
        assert_eq!(resolved[0].canonical, "jantry_rate");
        assert_eq!(resolved[0].phrase, "jantry value");
    }

    #[test]
    fn test_attributes_grouped_by_canonical() {
        let attributes = resolver().table().attributes();
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].canonical_name, "jantry_rate");
        assert_eq!(attributes[0].synonyms, vec!["jantry value", "jantry rate"]);
    }
}
