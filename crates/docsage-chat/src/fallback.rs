//! Deterministic answers built straight from retrieved passages.

use docsage_index::SearchResult;
use docsage_ingest::split_sentences;
use once_cell::sync::Lazy;
use regex::Regex;

/// Answer when no passage yields a usable sentence.
pub const NO_INFORMATION: &str = "No relevant information found in the documents.";

const MAX_PASSAGES: usize = 4;
const SENTENCES_PER_PASSAGE: usize = 2;
const MIN_PASSAGE_CHARS: usize = 50;
const MIN_SENTENCE_CHARS: usize = 30;
const MAX_SENTENCE_CHARS: usize = 300;

static PAGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[PAGE \d+\]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Bulleted summary of the leading sentences of the top passages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSynthesizer;

impl LocalSynthesizer {
    pub fn synthesize(&self, results: &[SearchResult]) -> String {
        let bullets: Vec<String> = results
            .iter()
            .take(MAX_PASSAGES)
            .map(|r| clean(r.text()))
            .filter(|text| text.chars().count() > MIN_PASSAGE_CHARS)
            .flat_map(|text| {
                split_sentences(&text)
                    .into_iter()
                    .take(SENTENCES_PER_PASSAGE)
                    .map(str::trim)
                    .filter(|s| {
                        let n = s.chars().count();
                        n > MIN_SENTENCE_CHARS && n < MAX_SENTENCE_CHARS
                    })
                    .map(|s| format!("• {s}"))
                    .collect::<Vec<_>>()
            })
            .collect();

        if bullets.is_empty() {
            return NO_INFORMATION.to_string();
        }

        let mut parts = vec![
            "**Document Overview**".to_string(),
            "Based on the uploaded document, here are the key points:".to_string(),
            "**Key Information**".to_string(),
        ];
        parts.extend(bullets);
        parts.join("\n\n")
    }
}

fn clean(text: &str) -> String {
    let without_markers = PAGE_MARKER_RE.replace_all(text, "");
    WHITESPACE_RE
        .replace_all(&without_markers, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_index::Chunk;

    fn hit(text: &str) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: "d_0".into(),
                text: text.into(),
                document_name: "d".into(),
                page_number: 1,
                token_count: 1,
            },
            score: 0.3,
        }
    }

    #[test]
    fn test_no_results() {
        assert_eq!(LocalSynthesizer.synthesize(&[]), NO_INFORMATION);
    }

    #[test]
    fn test_short_passages_ignored() {
        assert_eq!(LocalSynthesizer.synthesize(&[hit("Too short.")]), NO_INFORMATION);
    }

    #[test]
    fn test_first_two_sentences_bulleted() {
        let text = "[PAGE 2]\nThe reactor produced twelve megawatts during the trial.  \
                    Output stayed stable for the full six hours of testing. \
                    A third sentence that should not appear in the answer.";
        let answer = LocalSynthesizer.synthesize(&[hit(text)]);
        assert!(answer.contains("• The reactor produced twelve megawatts during the trial."));
        assert!(answer.contains("• Output stayed stable for the full six hours of testing."));
        assert!(!answer.contains("third sentence"));
        assert!(!answer.contains("[PAGE"));
    }

    #[test]
    fn test_at_most_four_passages() {
        let results: Vec<SearchResult> = (0..6)
            .map(|i| hit(&format!("Passage number {i} talks about an important subject at length.")))
            .collect();
        let answer = LocalSynthesizer.synthesize(&results);
        assert_eq!(answer.matches("• ").count(), 4);
    }
}
