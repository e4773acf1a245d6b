//! DocSage Answer — post-processing of generated answers.
//!
//! Everything here is deterministic: citations come from retrieved chunk
//! metadata, confidence from surface features of the answer, and sanitization
//! from a fixed pattern list.

pub mod citations;
pub mod confidence;
pub mod sanitize;

pub use citations::{extract_citations, should_show_citations, Citation};
pub use confidence::{confidence, GATED_CONFIDENCE_CAP};
pub use sanitize::{sanitize, SAFE_FALLBACK};

use docsage_index::SearchResult;

/// Citations and confidence for a sanitized answer, after the citation gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub citations: Vec<Citation>,
    pub confidence: f64,
}

/// Score `answer` and attach citations unless it admits it found nothing.
/// A gated answer carries no citations and at most `GATED_CONFIDENCE_CAP`.
pub fn assess(answer: &str, results: &[SearchResult]) -> Assessment {
    let score = confidence(answer, results);
    if should_show_citations(answer) {
        Assessment {
            citations: extract_citations(results),
            confidence: score,
        }
    } else {
        Assessment {
            citations: Vec::new(),
            confidence: score.min(GATED_CONFIDENCE_CAP),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_index::Chunk;

    fn hit(page: u32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("doc_{page}"),
                text: "text".into(),
                document_name: "doc".into(),
                page_number: page,
                token_count: 1,
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_please_upload_gates_citations() {
        let a = assess("Please upload a document first.", &[hit(1), hit(2)]);
        assert!(a.citations.is_empty());
        assert!(a.confidence <= 0.5);
    }

    #[test]
    fn test_grounded_answer_keeps_citations() {
        let a = assess("Revenue rose sharply in the second quarter.", &[hit(1), hit(2)]);
        assert_eq!(a.citations.len(), 2);
        assert!(a.confidence >= 0.7);
    }
}
