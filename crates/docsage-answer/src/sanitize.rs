//! Redaction of model identity and credential terms from generated text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Replaces answers that are empty or near-empty after redaction.
pub const SAFE_FALLBACK: &str = "I'm DocSage, a document analysis assistant. \
Please ask me questions about the content of your uploaded documents.";

const MIN_ANSWER_CHARS: usize = 20;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(trained by|developed by|created by|built by|made by)\s*(google|openai|anthropic|meta|microsoft)\b",
        r"(?i)\b(gemini|gpt-?\d*|claude|llama|palm|bard)\b",
        r"(?i)\bi am (a |an )?(large )?language model\b",
        r"(?i)\bi'm (a |an )?(large )?language model\b",
        r"(?i)\bas an? (ai|artificial intelligence|language model|llm)\b",
        r"(?i)\bapi[_\s]?key\b",
        r"(?i)\bsecret[_\s]?key\b",
        r"(?i)\baccess[_\s]?token\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static INLINE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip sensitive patterns, collapse the whitespace they leave behind and
/// fall back to `SAFE_FALLBACK` when fewer than 20 characters remain.
///
/// Line breaks survive so bulleted answers keep their layout.
pub fn sanitize(answer: &str) -> String {
    let mut text = answer.replace("\r\n", "\n");
    for pattern in SENSITIVE_PATTERNS.iter() {
        if pattern.is_match(&text) {
            debug!("Redacting pattern {}", pattern.as_str());
            text = pattern.replace_all(&text, "").into_owned();
        }
    }

    let collapsed = INLINE_SPACE_RE.replace_all(&text, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    let cleaned = BLANK_LINES_RE.replace_all(joined.trim(), "\n\n").into_owned();

    if cleaned.chars().count() < MIN_ANSWER_CHARS {
        return SAFE_FALLBACK.to_string();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_vendor_and_model_names() {
        let out = sanitize("This summary was built by OpenAI using GPT-4 and covers revenue.");
        let lower = out.to_lowercase();
        assert!(!lower.contains("openai"));
        assert!(!lower.contains("gpt"));
        assert!(lower.contains("covers revenue"));
        assert!(!out.contains("  "));
    }

    #[test]
    fn test_strips_self_identification_and_credentials() {
        let out = sanitize("As an AI, I note the api key and ACCESS_TOKEN fields in section two.");
        let lower = out.to_lowercase();
        assert!(!lower.contains("as an ai"));
        assert!(!lower.contains("api key"));
        assert!(!lower.contains("access_token"));
    }

    #[test]
    fn test_short_result_becomes_fallback() {
        assert_eq!(sanitize("I am a large language model."), SAFE_FALLBACK);
        assert_eq!(sanitize(""), SAFE_FALLBACK);
    }

    #[test]
    fn test_keeps_line_structure() {
        let answer = "**Key Information**\n\n•   First point about the report.\n\n\n\n• Second point.";
        assert_eq!(
            sanitize(answer),
            "**Key Information**\n\n• First point about the report.\n\n• Second point."
        );
    }

    #[test]
    fn test_clean_answer_unchanged() {
        let answer = "The study found a 12% increase in yield.";
        assert_eq!(sanitize(answer), answer);
    }
}
