//! Text normalization and vector math for the deduplication engine.

use std::sync::OnceLock;

use regex::Regex;

fn credit_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)(Image credit:.*$|Photo by .* on Unsplash.*$)").expect("valid regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Clean text ahead of fingerprinting: collapse whitespace runs and strip
/// image/photo credit lines that vary between syndicated copies of the
/// same story.
pub fn advanced_text_cleaner(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let collapsed = whitespace_re().replace_all(text, " ");
    let cleaned = credit_line_re().replace_all(collapsed.trim(), "");
    cleaned.trim().to_string()
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cosine similarity between two vectors.
///
/// Mismatched dimensions and zero-norm vectors yield 0.0 rather than an
/// error; a degenerate fingerprint must never poison a classification run.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
