//! Sentence-aligned chunking with a character overlap tail.
//!
//! Sizes are measured with a word-count token estimate, never an actual
//! tokenizer, so output is deterministic for a given input.

use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[PAGE (\d+)\]").unwrap());

/// Words per token in the estimate.
const WORDS_PER_TOKEN: f64 = 1.3;

/// Estimated token count: `max(1, round(words / 1.3))`.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_words(text.split_whitespace().count())
}

fn tokens_for_words(words: usize) -> usize {
    ((words as f64 / WORDS_PER_TOKEN).round() as usize).max(1)
}

/// Split on `.`, `!` or `?` followed by whitespace. The punctuation stays with
/// its sentence; the whitespace run is dropped. Empty pieces are skipped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let mut resume = end;
        while let Some(&(j, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            resume = j + next.len_utf8();
            chars.next();
        }
        if resume > end {
            if end > start {
                sentences.push(&text[start..end]);
            }
            start = resume;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// First `[PAGE n]` marker in `text`, or 1.
pub fn extract_page_number(text: &str) -> u32 {
    PAGE_MARKER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|n| n.max(1))
        .unwrap_or(1)
}

/// Greedy sentence packer.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    /// Target size in estimated tokens.
    pub chunk_size: usize,
    /// Overlap parameter. The carried tail is
    /// `chunk_size * overlap / 100` characters of the previous chunk.
    pub overlap: usize,
}

impl SentenceChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    /// Number of trailing characters carried into the next chunk.
    pub fn overlap_chars(&self) -> usize {
        self.chunk_size.saturating_mul(self.overlap) / 100
    }

    /// Split `text` into trimmed chunks. A sentence longer than the target is
    /// emitted whole.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_words = 0usize;

        for sentence in split_sentences(text) {
            let sentence_words = sentence.split_whitespace().count();
            let would_be = tokens_for_words(current_words + sentence_words);

            if would_be > self.chunk_size && !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
                let tail = char_tail(&current, self.overlap_chars());
                current = format!("{tail} {sentence}");
                current_words = current.split_whitespace().count();
            } else {
                current.push(' ');
                current.push_str(sentence);
                current_words += sentence_words;
            }
        }

        let last = current.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }
        chunks
    }
}

/// Last `n` characters of `s`.
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(n: usize, words_each: usize) -> String {
        (0..n)
            .map(|i| {
                let body: Vec<String> = (0..words_each).map(|w| format!("w{i}x{w}")).collect();
                format!("{}.", body.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("one"), 1);
        assert_eq!(estimate_tokens("one two three"), 2);
        assert_eq!(estimate_tokens(&"w ".repeat(13)), 10);
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let parts = split_sentences("First one. Second!  Third?\nFourth");
        assert_eq!(parts, vec!["First one.", "Second!", "Third?", "Fourth"]);
    }

    #[test]
    fn test_split_sentences_ignores_inline_punctuation() {
        assert_eq!(split_sentences("Version 2.5 shipped."), vec!["Version 2.5 shipped."]);
    }

    #[test]
    fn test_empty_input_gives_no_chunks() {
        let chunker = SentenceChunker::new(50, 20);
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n ").is_empty());
    }

    #[test]
    fn test_zero_overlap_reconstructs_sentences() {
        let text = sentences(12, 6);
        let chunker = SentenceChunker::new(10, 0);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(" "), split_sentences(&text).join(" "));
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = sentences(20, 5);
        let chunker = SentenceChunker::new(12, 0);
        for chunk in chunker.split(&text) {
            assert!(estimate_tokens(&chunk) <= 12, "oversized chunk: {chunk}");
        }
    }

    #[test]
    fn test_zero_overlap_shares_no_leading_text() {
        let text = sentences(8, 6);
        let chunks = SentenceChunker::new(8, 0).split(&text);
        for pair in chunks.windows(2) {
            let prev_last = split_sentences(&pair[0]).last().copied().unwrap();
            assert!(!pair[1].starts_with(prev_last));
        }
    }

    #[test]
    fn test_overlap_carries_character_tail() {
        let text = sentences(6, 6);
        let chunker = SentenceChunker::new(8, 50);
        assert_eq!(chunker.overlap_chars(), 4);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        let tail: String = {
            let prev = format!(" {}", chunks[0]);
            let n = prev.chars().count();
            prev.chars().skip(n - 4).collect()
        };
        assert!(chunks[1].starts_with(tail.trim()));
    }

    #[test]
    fn test_oversized_sentence_emitted_whole() {
        let long = sentences(1, 40);
        let chunks = SentenceChunker::new(5, 0).split(&long);
        assert_eq!(chunks, vec![long]);
    }

    #[test]
    fn test_extract_page_number() {
        assert_eq!(extract_page_number("[PAGE 3]\nbody [PAGE 4]"), 3);
        assert_eq!(extract_page_number("no marker"), 1);
        assert_eq!(extract_page_number("[PAGE 0] zero"), 1);
    }

    #[test]
    fn test_overlap_saturates_on_huge_settings() {
        let chunker = SentenceChunker::new(usize::MAX, usize::MAX);
        assert_eq!(chunker.overlap_chars(), usize::MAX / 100);
        let chunks = chunker.split("One sentence here. Another one there.");
        assert_eq!(chunks, vec!["One sentence here. Another one there."]);
    }
}
