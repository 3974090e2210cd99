//! Deterministic value extraction used when generation fails
//!
//! Question extraction tries, in order:
//! 1. Line scan: the first line containing every keyword, value captured
//!    after `:` or `|` (currency marker, digits, optional unit word)
//! 2. Loose scan: keywords joined in question order, value captured after an
//!    optional delimiter, over the whole document
//!
//! Attribute extraction matches lines on an alphanumeric-only form of the
//! attribute phrase, then falls back to a loose scan keyed on the raw phrase.

use crate::models::SENTINEL;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Plausible length of an attribute value, in characters
const MIN_VALUE_LEN: usize = 2;
const MAX_VALUE_LEN: usize = 120;

/// Value characters accepted by the loose scan. No newlines.
const LOOSE_VALUE: &str = r"[:|\-]?[ \t]*([\w \t.,/₹$-]+)";

fn line_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[:|]\s*((?:rs\.?|inr|₹|\$)?\s*\d[\d,.]*(?:\s*/?\s*[a-z]+\.?)?)")
            .expect("line value pattern is valid")
    })
}

/// Which strategy produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    LineScan,
    LooseScan,
    AttributeLine,
    AttributeLoose,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::LineScan => "line_scan",
            ExtractionStrategy::LooseScan => "loose_scan",
            ExtractionStrategy::AttributeLine => "attribute_line",
            ExtractionStrategy::AttributeLoose => "attribute_loose",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub value: String,
    pub strategy: ExtractionStrategy,
}

/// Regex fallback extractor. Pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl RegexExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracted value, or `"Not mentioned."`
    pub fn extract(&self, text: &str, keywords: &[String]) -> String {
        self.try_extract(text, keywords)
            .map(|e| e.value)
            .unwrap_or_else(|| SENTINEL.to_string())
    }

    pub fn try_extract(&self, text: &str, keywords: &[String]) -> Option<Extraction> {
        if keywords.is_empty() {
            return None;
        }
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        self.line_scan(text, &keywords)
            .map(|value| Extraction {
                value,
                strategy: ExtractionStrategy::LineScan,
            })
            .or_else(|| {
                loose_scan(text, &keywords).map(|value| Extraction {
                    value,
                    strategy: ExtractionStrategy::LooseScan,
                })
            })
    }

    fn line_scan(&self, text: &str, keywords: &[String]) -> Option<String> {
        text.lines()
            .filter(|line| {
                let lower = line.to_lowercase();
                keywords.iter().all(|k| lower.contains(k.as_str()))
            })
            .find_map(|line| {
                line_value_pattern()
                    .captures(line)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty())
            })
    }

    /// Value for one attribute phrase, or `None`
    pub fn extract_attribute(&self, text: &str, phrase: &str) -> Option<Extraction> {
        let key = alphanumeric_key(phrase);
        if key.is_empty() {
            return None;
        }

        let from_line = text
            .lines()
            .filter(|line| alphanumeric_key(line).contains(&key))
            .find_map(|line| value_after_label(line, &key).filter(|v| plausible(v)));

        if let Some(value) = from_line {
            return Some(Extraction {
                value,
                strategy: ExtractionStrategy::AttributeLine,
            });
        }

        loose_scan(text, &[phrase.trim().to_string()])
            .filter(|v| plausible(v))
            .map(|value| Extraction {
                value,
                strategy: ExtractionStrategy::AttributeLoose,
            })
    }
}

fn loose_scan(text: &str, keywords: &[String]) -> Option<String> {
    let joined = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join(".*?");
    let pattern = Regex::new(&format!("(?i){joined}.*?{LOOSE_VALUE}")).ok()?;

    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| trim_value(m.as_str()))
        .filter(|v| !v.is_empty())
}

/// `-` is a value character, so a `Label - value` capture starts with it
fn trim_value(raw: &str) -> String {
    raw.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '|'))
        .trim_end()
        .to_string()
}

/// Lowercase, alphanumerics only
fn alphanumeric_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Text after the first `:` or `|`. For table rows (`a | b | c`) this is the
/// first non-empty cell after the one naming the attribute.
fn value_after_label(line: &str, key: &str) -> Option<String> {
    let delimiter = line.find(|c: char| c == ':' || c == '|')?;

    if line[delimiter..].starts_with(':') {
        let rest = &line[delimiter + 1..];
        let value = rest.split('|').next().unwrap_or(rest).trim();
        return Some(value.to_string()).filter(|v| !v.is_empty());
    }

    let cells: Vec<&str> = line.split('|').map(str::trim).collect();
    let label = cells
        .iter()
        .position(|cell| alphanumeric_key(cell).contains(key))
        .unwrap_or(0);

    cells[label + 1..]
        .iter()
        .find(|cell| !cell.is_empty())
        .map(|cell| cell.to_string())
}

fn plausible(value: &str) -> bool {
    let len = value.chars().count();
    (MIN_VALUE_LEN..=MAX_VALUE_LEN).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    const DEED: &str = "Property: Green Valley Plot 12\n\
                        Owner: Ramesh Patel\n\
                        Jantry Value: Rs. 12,000/sqm\n\
                        Market Value | 4,50,00,000 | as on 2023\n\
                        Remarks: clear title";

    #[test]
    fn test_line_scan_currency_and_unit() {
        let extractor = RegexExtractor::new();
        let found = extractor.try_extract(DEED, &kws(&["jantry", "value"])).unwrap();
        assert_eq!(found.strategy, ExtractionStrategy::LineScan);
        assert!(found.value.contains("12,000"), "got {}", found.value);
    }

    #[test]
    fn test_line_scan_table_row() {
        let extractor = RegexExtractor::new();
        let value = extractor.extract(DEED, &kws(&["market"]));
        assert!(value.starts_with("4,50,00,000"), "got {value}");
    }

    #[test]
    fn test_loose_scan_text_value() {
        let extractor = RegexExtractor::new();
        let found = extractor.try_extract(DEED, &kws(&["owner"])).unwrap();
        assert_eq!(found.strategy, ExtractionStrategy::LooseScan);
        assert_eq!(found.value, "Ramesh Patel");
    }

    #[test]
    fn test_loose_scan_does_not_cross_lines() {
        let extractor = RegexExtractor::new();
        let value = extractor.extract(DEED, &kws(&["remarks"]));
        assert_eq!(value, "clear title");
    }

    #[test]
    fn test_empty_keywords_give_sentinel() {
        let extractor = RegexExtractor::new();
        assert_eq!(extractor.extract(DEED, &[]), SENTINEL);
    }

    #[test]
    fn test_no_match_gives_sentinel() {
        let extractor = RegexExtractor::new();
        assert_eq!(extractor.extract(DEED, &kws(&["survey", "boundary"])), SENTINEL);
        assert_eq!(extractor.extract("", &kws(&["owner"])), SENTINEL);
    }

    #[test]
    fn test_keywords_are_escaped() {
        let extractor = RegexExtractor::new();
        assert_eq!(
            extractor.extract("a+b (x): seven units", &kws(&["(x"])),
            "seven units"
        );
    }

    #[test]
    fn test_no_matching_line_gives_sentinel() {
        let extractor = RegexExtractor::new();
        let text = "=== OWNER ===\nName: Raj Patel";
        assert_eq!(extractor.extract(text, &kws(&["jantry", "value"])), SENTINEL);
    }

    #[test]
    fn test_loose_scan_keeps_accented_letters() {
        let extractor = RegexExtractor::new();
        let text = "Owner: José Álvarez\nArea: 450 sqm";
        assert_eq!(extractor.extract(text, &kws(&["owner"])), "José Álvarez");
    }

    #[test]
    fn test_loose_scan_keeps_gujarati_script() {
        let extractor = RegexExtractor::new();
        let text = "Survey No 12\nOwner: રમેશ પટેલ";
        assert_eq!(extractor.extract(text, &kws(&["owner"])), "રમેશ પટેલ");
    }

    #[test]
    fn test_attribute_dash_delimiter() {
        let extractor = RegexExtractor::new();
        let found = extractor
            .extract_attribute("Owner Name - José Álvarez", "owner name")
            .unwrap();
        assert_eq!(found.strategy, ExtractionStrategy::AttributeLoose);
        assert_eq!(found.value, "José Álvarez");
    }

    #[test]
    fn test_attribute_colon_line() {
        let extractor = RegexExtractor::new();
        let found = extractor.extract_attribute(DEED, "jantry value").unwrap();
        assert_eq!(found.strategy, ExtractionStrategy::AttributeLine);
        assert_eq!(found.value, "Rs. 12,000/sqm");
    }

    #[test]
    fn test_attribute_table_cell() {
        let extractor = RegexExtractor::new();
        let found = extractor.extract_attribute(DEED, "Market-Value").unwrap();
        assert_eq!(found.value, "4,50,00,000");
    }

    #[test]
    fn test_attribute_length_band() {
        let extractor = RegexExtractor::new();
        let long = format!("Remarks: {}", "x".repeat(200));
        assert!(extractor.extract_attribute(&long, "remarks").is_none());
        assert!(extractor.extract_attribute("Area: 9", "area").is_none());
    }

    #[test]
    fn test_attribute_missing() {
        let extractor = RegexExtractor::new();
        assert!(extractor.extract_attribute(DEED, "distress value").is_none());
        assert!(extractor.extract_attribute(DEED, "  ").is_none());
    }
}
