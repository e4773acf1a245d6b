//! Source citations and the citation gate.

use std::collections::HashSet;

use docsage_index::SearchResult;
use serde::{Deserialize, Serialize};

/// Provenance pointer attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub page: u32,
    pub chunk_id: String,
}

/// Phrases showing the answer was not grounded in the documents.
const NO_CITATION_PHRASES: &[&str] = &[
    "does not contain",
    "no information",
    "cannot provide",
    "cannot find",
    "not found in",
    "no relevant",
    "insufficient information",
    "don't have information",
    "unable to find",
    "not mentioned",
    "not available",
    "i'm docsage",
    "i am docsage",
    "i cannot answer",
    "outside the scope",
    "not in the document",
    "the document doesn't",
    "the documents don't",
    "please upload",
];

/// One citation per distinct `(document, page)`, in first-seen order, carrying
/// the first chunk id seen for that pair.
pub fn extract_citations(results: &[SearchResult]) -> Vec<Citation> {
    let mut seen: HashSet<(&str, u32)> = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert((r.chunk.document_name.as_str(), r.chunk.page_number)))
        .map(|r| Citation {
            document: r.chunk.document_name.clone(),
            page: r.chunk.page_number,
            chunk_id: r.chunk.id.clone(),
        })
        .collect()
}

pub fn should_show_citations(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    !NO_CITATION_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_index::Chunk;

    fn hit(id: &str, doc: &str, page: u32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: id.into(),
                text: String::new(),
                document_name: doc.into(),
                page_number: page,
                token_count: 1,
            },
            score: 1.0,
        }
    }

    #[test]
    fn test_dedup_by_document_and_page() {
        let citations = extract_citations(&[
            hit("a_0", "a.pdf", 1),
            hit("a_1", "a.pdf", 1),
            hit("b_0", "b.pdf", 1),
            hit("a_2", "a.pdf", 2),
        ]);
        let keys: Vec<(&str, u32, &str)> = citations
            .iter()
            .map(|c| (c.document.as_str(), c.page, c.chunk_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("a.pdf", 1, "a_0"), ("b.pdf", 1, "b_0"), ("a.pdf", 2, "a_2")]
        );
    }

    #[test]
    fn test_gate_is_case_insensitive() {
        assert!(!should_show_citations("I CANNOT FIND that in the files."));
        assert!(!should_show_citations("Please upload a PDF."));
        assert!(should_show_citations("The report covers three regions."));
    }

    #[test]
    fn test_citation_wire_shape() {
        let json = serde_json::to_value(Citation {
            document: "a.pdf".into(),
            page: 2,
            chunk_id: "a.pdf_3".into(),
        })
        .unwrap();
        assert_eq!(json["chunk_id"], "a.pdf_3");
        assert_eq!(json["page"], 2);
    }
}
