//! Fuzzy matching of a free-text query against document metadata

use crate::models::{Document, Match};
use std::collections::HashSet;

/// Default minimum score for a document to be kept
pub const DEFAULT_THRESHOLD: f64 = 40.0;

/// Scores property and owner names against a query. Pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher;

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Case-fold, map punctuation (including `_`) to spaces, collapse whitespace
    pub fn normalize(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Similarity of two strings on a 0-100 scale
    pub fn score(&self, query: &str, candidate: &str) -> f64 {
        let query = Self::normalize(query);
        let candidate = Self::normalize(candidate);
        if query.is_empty() || candidate.is_empty() {
            return 0.0;
        }

        let overlap = token_overlap(&query, &candidate);
        let similarity = if candidate.contains(&query) || query.contains(&candidate) {
            1.0
        } else {
            indel_ratio(&query, &candidate)
        };

        (overlap + similarity) / 2.0 * 100.0
    }

    /// Best score over the property name and, when present, the owner name
    pub fn score_document(&self, query: &str, document: &Document) -> f64 {
        let by_property = self.score(query, &document.property_name);
        match document.owner_name.as_deref() {
            Some(owner) => by_property.max(self.score(query, owner)),
            None => by_property,
        }
    }

    /// Documents scoring at least `threshold`, best first. Ties keep input order.
    pub fn rank(&self, query: &str, candidates: &[Document], threshold: f64) -> Vec<Match> {
        if Self::normalize(query).is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<Match> = candidates
            .iter()
            .map(|doc| Match {
                score: self.score_document(query, doc),
                document: doc.clone(),
            })
            .filter(|m| m.score >= threshold)
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches
    }
}

/// Share of distinct query tokens that also appear in the candidate
fn token_overlap(query: &str, candidate: &str) -> f64 {
    let query_tokens: HashSet<&str> = query.split(' ').collect();
    let candidate_tokens: HashSet<&str> = candidate.split(' ').collect();
    let shared = query_tokens.intersection(&candidate_tokens).count();
    shared as f64 / query_tokens.len() as f64
}

/// `2 * LCS / (|a| + |b|)` over characters
fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str, owner: Option<&str>) -> Document {
        Document {
            id: id.to_string(),
            property_name: name.to_string(),
            owner_name: owner.map(str::to_string),
            content: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(FuzzyMatcher::normalize("  Green_Valley,  Plot-12 "), "green valley plot 12");
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let matcher = FuzzyMatcher::new();
        assert_eq!(matcher.score("GREEN-VALLEY", "Green Valley"), 100.0);
    }

    #[test]
    fn test_snake_case_name_ranks() {
        let matcher = FuzzyMatcher::new();
        let candidates = vec![doc("7", "santosha_green_city", None)];
        let matches = matcher.rank("Santosha Green City", &candidates, DEFAULT_THRESHOLD);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 100.0);
    }

    #[test]
    fn test_misspelling_still_matches() {
        let matcher = FuzzyMatcher::new();
        let score = matcher.score("sunrise appartments", "Sunrise Apartments");
        assert!(score > 60.0, "score was {score}");
    }

    #[test]
    fn test_indel_ratio() {
        assert_eq!(indel_ratio("abc", "abc"), 1.0);
        assert_eq!(indel_ratio("abc", "xyz"), 0.0);
        assert!((indel_ratio("abcd", "abxd") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_owner_name_counts() {
        let matcher = FuzzyMatcher::new();
        let candidates = vec![doc("1", "Lakeview Towers", Some("Ramesh Patel"))];
        let matches = matcher.rank("ramesh patel", &candidates, DEFAULT_THRESHOLD);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 100.0);
    }

    #[test]
    fn test_rank_orders_and_filters() {
        let matcher = FuzzyMatcher::new();
        let candidates = vec![
            doc("1", "Riverside Bungalow", None),
            doc("2", "Green Valley Plot", None),
            doc("3", "Green Valley", None),
        ];
        let matches = matcher.rank("green valley", &candidates, DEFAULT_THRESHOLD);
        let ids: Vec<&str> = matches.iter().map(|m| m.document.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let matcher = FuzzyMatcher::new();
        let candidates = vec![
            doc("b", "Green Valley", None),
            doc("a", "green valley", None),
        ];
        let matches = matcher.rank("green valley", &candidates, DEFAULT_THRESHOLD);
        let ids: Vec<&str> = matches.iter().map(|m| m.document.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_inputs() {
        let matcher = FuzzyMatcher::new();
        assert!(matcher.rank("", &[doc("1", "Green Valley", None)], 0.0).is_empty());
        assert!(matcher.rank("green", &[], 0.0).is_empty());
    }
}
