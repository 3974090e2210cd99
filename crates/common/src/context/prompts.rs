//! Prompt templates and response handling
//!
//! Provides:
//! - Question prompts for general and document-grounded questions
//! - Extraction prompts for comparison cells
//! - The acceptance policy applied to generated answers
//! - `Answer: <value>` parsing

use crate::models::QuestionMode;
use regex::Regex;
use std::sync::OnceLock;

/// Phrase marking a generated answer as a refusal
const REJECTION_MARKER: &str = "not found";

/// Shortest acceptable answer, exclusive
const MIN_ANSWER_CHARS: usize = 3;

fn answer_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Answer[:\-]\s*(.*)").expect("answer pattern is valid"))
}

/// Prompt for a single-document question. Compare mode never reaches here;
/// it is treated as grounded.
pub fn question_prompt(mode: QuestionMode, chunk: &str, question: &str) -> String {
    match mode {
        QuestionMode::General => format!(
            "You are a helpful assistant.\n\
             Based on the below document, answer the user's question as best as possible.\n\n\
             Document:\n'''{chunk}'''\n\n\
             Question:\n\"{question}\"\n\n\
             Answer:"
        ),
        QuestionMode::Grounded | QuestionMode::Compare => format!(
            "You are a helpful assistant for property document analysis.\n\n\
             Document:\n'''{chunk}'''\n\n\
             Question:\n\"{question}\"\n\n\
             Answer (only if it is based on document text above):"
        ),
    }
}

/// Prompt asking for one attribute from one chunk
pub fn extraction_prompt(attribute: &str, chunk: &str) -> String {
    format!(
        "You are extracting document data for property comparison.\n\
         From the below document chunk, extract only the {attribute} if available.\n\n\
         Document:\n'''{chunk}'''\n\n\
         Provide answer in format:\n\
         Answer: <value>"
    )
}

/// Trimmed text is longer than three characters and does not say "not found"
pub fn is_acceptable(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.chars().count() > MIN_ANSWER_CHARS
        && !trimmed.to_lowercase().contains(REJECTION_MARKER)
}

/// Value of the first `Answer:` / `Answer-` line. An empty value is no value.
pub fn parse_answer_line(response: &str) -> Option<String> {
    answer_line()
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_policy() {
        assert!(is_acceptable("  Ramesh Patel "));
        assert!(!is_acceptable("   "));
        assert!(!is_acceptable("N/A"));
        assert!(!is_acceptable("The owner is NOT FOUND in this text"));
    }

    #[test]
    fn test_parse_answer_line() {
        assert_eq!(
            parse_answer_line("Sure.\nAnswer: Rs. 4,500 per sq ft\nThanks").as_deref(),
            Some("Rs. 4,500 per sq ft")
        );
        assert_eq!(parse_answer_line("Answer-  12 acres").as_deref(), Some("12 acres"));
    }

    #[test]
    fn test_parse_answer_line_failures() {
        assert!(parse_answer_line("The owner is Ramesh").is_none());
        assert!(parse_answer_line("Answer:   \n").is_none());
    }

    #[test]
    fn test_grounded_prompt_restricts_to_document() {
        let prompt = question_prompt(QuestionMode::Grounded, "Owner: Ramesh", "who is the owner");
        assert!(prompt.contains("only if it is based on document text above"));
        assert!(prompt.contains("'''Owner: Ramesh'''"));
    }

    #[test]
    fn test_general_prompt() {
        let prompt = question_prompt(QuestionMode::General, "text", "summarise");
        assert!(prompt.contains("as best as possible"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_extraction_prompt_asks_for_answer_format() {
        let prompt = extraction_prompt("jantry value", "chunk");
        assert!(prompt.contains("extract only the jantry value"));
        assert!(prompt.ends_with("Answer: <value>"));
    }
}
