//! TF-IDF vectorizer over word n-grams.
//!
//! Tokens are lower-cased runs of two or more word characters. Stop words are
//! removed before n-grams are formed. Term weights are raw counts times the
//! smoothed inverse document frequency `ln((1 + n) / (1 + df)) + 1`, and every
//! row is L2-normalised, so the dot product of two rows is their cosine.

use std::collections::{BTreeMap, HashMap, HashSet};

use ndarray::Array1;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::stopwords::is_stop_word;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Analyzer and vocabulary settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfidfParams {
    /// Inclusive n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Keep only this many terms, by corpus frequency.
    pub max_features: Option<usize>,
    pub stop_words: bool,
}

impl TfidfParams {
    /// Unigrams and bigrams, 5000-term vocabulary. Used for the index.
    pub fn retrieval() -> Self {
        Self {
            ngram_range: (1, 2),
            max_features: Some(5000),
            stop_words: true,
        }
    }

    /// Unigrams, uncapped. Used for re-ranking comparisons.
    pub fn rerank() -> Self {
        Self {
            ngram_range: (1, 1),
            max_features: None,
            stop_words: true,
        }
    }
}

impl Default for TfidfParams {
    fn default() -> Self {
        Self::retrieval()
    }
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    params: TfidfParams,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    fitted: bool,
}

impl TfidfVectorizer {
    pub fn new(params: TfidfParams) -> Self {
        Self {
            params,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    pub fn params(&self) -> TfidfParams {
        self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Split text into the terms this vectorizer counts.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !(self.params.stop_words && is_stop_word(t)))
            .collect();

        let (min_n, max_n) = self.params.ngram_range;
        let mut terms = Vec::new();
        for n in min_n.max(1)..=max_n.max(min_n.max(1)) {
            if n == 1 {
                terms.extend(tokens.iter().map(|t| t.to_string()));
            } else {
                terms.extend(tokens.windows(n).map(|w| w.join(" ")));
            }
        }
        terms
    }

    /// Learn vocabulary and IDF weights from `docs`, replacing any earlier fit.
    ///
    /// A corpus with no countable terms yields an empty vocabulary; every
    /// vector is then all zeros.
    pub fn fit(&mut self, docs: &[&str]) {
        let analyzed: Vec<Vec<String>> = docs.iter().map(|d| self.analyze(d)).collect();

        // term -> (total count, document frequency), ordered by term
        let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for terms in &analyzed {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in terms {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.0 += 1;
                if seen.insert(term.as_str()) {
                    entry.1 += 1;
                }
            }
        }

        let mut kept: Vec<(&str, (usize, usize))> = stats.into_iter().collect();
        if let Some(limit) = self.params.max_features {
            if kept.len() > limit {
                // Highest total count first; ties resolved by term order.
                kept.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.0.cmp(b.0)));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        let n = docs.len() as f32;
        self.vocabulary = kept
            .iter()
            .enumerate()
            .map(|(i, (term, _))| (term.to_string(), i))
            .collect();
        self.idf = kept
            .iter()
            .map(|(_, (_, df))| ((1.0 + n) / (1.0 + *df as f32)).ln() + 1.0)
            .collect();
        self.fitted = true;
    }

    /// Vectorize `text` under the fitted vocabulary. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> Array1<f32> {
        let mut row = Array1::<f32>::zeros(self.idf.len());
        for term in self.analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                row[idx] += 1.0;
            }
        }
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
        row
    }

    pub fn fit_transform(&mut self, docs: &[&str]) -> Vec<Array1<f32>> {
        self.fit(docs);
        docs.iter().map(|d| self.transform(d)).collect()
    }

    pub fn reset(&mut self) {
        self.vocabulary.clear();
        self.idf.clear();
        self.fitted = false;
    }
}
