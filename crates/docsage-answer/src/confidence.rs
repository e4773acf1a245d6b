//! Heuristic answer confidence.

use docsage_index::SearchResult;

/// Returned for answers that admit they could not answer.
pub const LOW_CONFIDENCE: f64 = 0.4;
/// Upper bound on confidence when citations were suppressed.
pub const GATED_CONFIDENCE_CAP: f64 = 0.5;

const MIN_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE: f64 = 0.95;

const LOW_CONFIDENCE_PHRASES: &[&str] = &[
    "insufficient information",
    "no relevant",
    "cannot find",
    "don't have",
    "not found",
    "unable to",
    "error",
];

/// Score in `[0.3, 0.95]`, or exactly 0.4 for an admission of failure.
pub fn confidence(answer: &str, results: &[SearchResult]) -> f64 {
    let lower = answer.to_lowercase();
    if LOW_CONFIDENCE_PHRASES.iter().any(|p| lower.contains(p)) {
        return LOW_CONFIDENCE;
    }

    let base = if results.is_empty() { 0.3 } else { 0.7 };

    let words = answer.split_whitespace().count();
    let length_boost = match words {
        w if w > 100 => 0.15,
        w if w > 50 => 0.10,
        w if w > 20 => 0.05,
        _ => 0.0,
    };

    let source_boost = (0.02 * results.len() as f64).min(0.10);

    let citation_boost = if lower.contains("page") || lower.contains("document") {
        0.05
    } else {
        0.0
    };

    (base + length_boost + source_boost + citation_boost).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
