//! Text utilities for titles, slugs, and plain-text projections.

use std::sync::OnceLock;

use regex::Regex;

/// Hard maximum length of the SEO title tag.
pub const TITLE_TAG_HARD_MAX_LEN: usize = 65;

/// Hard maximum length of the page H1.
pub const SEO_H1_HARD_MAX_LEN: usize = 75;

/// Target maximum for the meta description before truncation kicks in.
pub const META_DESC_TARGET_MAX_LEN: usize = 155;

/// Hard maximum for the meta description.
pub const META_DESC_HARD_MAX_LEN: usize = 160;

/// Maximum slug length.
pub const SLUG_MAX_LEN: usize = 75;

const SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "for", "nor", "on", "at", "to", "from", "by", "in",
    "of", "up", "as", "is", "it",
];

/// Derive a URL-safe slug: lowercase, drop everything but alphanumerics,
/// whitespace, and hyphens, collapse runs to single hyphens, cap at 75.
///
/// Inputs differing only by case, punctuation, or surrounding whitespace
/// produce identical slugs.
pub fn slugify(text: &str) -> String {
    if text.trim().is_empty() {
        return "untitled-article-slug".to_string();
    }

    let lowered = text.trim().to_lowercase();
    let filtered: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    let slug = filtered
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let mut truncated: String = slug.chars().take(SLUG_MAX_LEN).collect();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    if truncated.is_empty() {
        return "untitled-article-slug".to_string();
    }
    truncated
}

/// Title-case a headline, keeping small words lowercase except at either
/// end. Stray replacement characters from the model are scrubbed to an
/// em dash first.
pub fn to_title_case(text: &str) -> String {
    let text = text.replace('\u{FFFD}', "—");
    let words: Vec<&str> = text.split(' ').collect();
    let last = words.len().saturating_sub(1);

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i != 0 && i != last && SMALL_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

/// Truncate a headline to at most `max_length` characters including the
/// ellipsis, preferring a word boundary within 20 characters of the cut,
/// and never leaving trailing spaces, periods, or commas before the
/// ellipsis.
pub fn truncate_headline(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.replace('\u{FFFD}', "—").chars().collect();
    if chars.len() <= max_length {
        return chars.into_iter().collect();
    }

    let budget = max_length.saturating_sub(3);
    let truncated: String = chars[..budget].iter().collect();
    let cut = match truncated.rfind(' ') {
        Some(last_space) if last_space > budget.saturating_sub(20) => &truncated[..last_space],
        _ => truncated.as_str(),
    };
    format!("{}...", cut.trim_end_matches([' ', '.', ',']))
}

/// Truncate plain text at a word boundary, appending an ellipsis. Used
/// for the JSON-LD article body and the meta description.
pub fn truncate_at_word_boundary(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }

    let truncated: String = chars[..max_length].iter().collect();
    match truncated.rfind(' ') {
        Some(last_space) if last_space > max_length.saturating_sub(50) => {
            format!("{}...", truncated[..last_space].trim_end())
        }
        _ => format!("{}...", truncated.trim_end()),
    }
}

fn markdown_strip_res() -> &'static [(Regex, &'static str); 12] {
    static RES: OnceLock<[(Regex, &'static str); 12]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            (Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid regex"), " "),
            (Regex::new(r"(?is)<style.*?>.*?</style>").expect("valid regex"), " "),
            (Regex::new(r"(?s)```.*?```").expect("valid regex"), " "),
            (Regex::new(r"(?s)<!--.*?-->").expect("valid regex"), " "),
            (Regex::new(r"<[^>]+>").expect("valid regex"), " "),
            (Regex::new(r"(?m)^\s*#{1,6}\s+").expect("valid regex"), ""),
            (Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("valid regex"), "$1"),
            (Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"), "$1"),
            (Regex::new(r"(\*\*|__)([^*_]+?)(\*\*|__)").expect("valid regex"), "$2"),
            (Regex::new(r"[*_]([^*_]+?)[*_]").expect("valid regex"), "$1"),
            (Regex::new(r"`([^`]*)`").expect("valid regex"), "$1"),
            (Regex::new(r"(?m)^\s*(?:>|[*+-]|\d+\.)\s+").expect("valid regex"), ""),
        ]
    })
}

/// Strip markdown and HTML down to plain text, collapsing whitespace.
pub fn strip_markdown(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in markdown_strip_res() {
        out = re.replace_all(&out, *replacement).to_string();
    }
    let ws = Regex::new(r"\s{2,}").expect("valid regex");
    ws.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_stable_across_case_punctuation_whitespace() {
        let a = slugify("  NVIDIA Blackwell B200: A New Titan!  ");
        let b = slugify("nvidia blackwell b200 a new titan");
        assert_eq!(a, b);
        assert_eq!(a, "nvidia-blackwell-b200-a-new-titan");
    }

    #[test]
    fn slug_is_bounded_and_charset_limited() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn slug_empty_input_gets_placeholder() {
        assert_eq!(slugify("   "), "untitled-article-slug");
        assert_eq!(slugify("!!!"), "untitled-article-slug");
    }

    #[test]
    fn title_case_keeps_small_words_lowercase_inside() {
        assert_eq!(
            to_title_case("the rise of the machines"),
            "The Rise of the Machines"
        );
    }

    #[test]
    fn title_case_scrubs_replacement_chars() {
        assert!(!to_title_case("NVIDIA\u{FFFD}s Chip").contains('\u{FFFD}'));
    }

    #[test]
    fn truncate_headline_under_limit_unchanged() {
        assert_eq!(truncate_headline("Short Title", 65), "Short Title");
    }

    #[test]
    fn truncate_headline_cuts_at_word_boundary() {
        let long = "This Headline Is Considerably Longer Than The Hard Limit Allows For Sure";
        let cut = truncate_headline(long, 65);
        assert!(cut.chars().count() <= 65);
        assert!(cut.ends_with("..."));
        // Never cuts inside a word when a boundary exists within 20 chars.
        let without_ellipsis = cut.trim_end_matches("...");
        assert!(long.starts_with(without_ellipsis));
        assert!(long.as_bytes()[without_ellipsis.len()] == b' ');
    }

    #[test]
    fn truncate_headline_strips_trailing_punctuation() {
        let text = "A sentence that ends with period exactly at, the cut point here. and more";
        let cut = truncate_headline(text, 64);
        assert!(!cut.trim_end_matches("...").ends_with([' ', '.', ',']));
    }

    #[test]
    fn word_boundary_truncation_for_meta() {
        let text = "word ".repeat(100);
        let cut = truncate_at_word_boundary(text.trim(), META_DESC_TARGET_MAX_LEN);
        assert!(cut.chars().count() <= META_DESC_HARD_MAX_LEN);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn strip_markdown_removes_structure() {
        let md = "## Heading\n\nSome **bold** and *italic* text with [a link](https://x.com) \
                  and `code`.\n\n```rust\nfn main() {}\n```\n\n<!-- IMAGE_PLACEHOLDER: x -->\n\n\
                  - item one\n> quoted";
        let plain = strip_markdown(md);
        assert!(!plain.contains('#'));
        assert!(!plain.contains("**"));
        assert!(!plain.contains("```"));
        assert!(!plain.contains("<!--"));
        assert!(plain.contains("a link"));
        assert!(plain.contains("item one"));
        assert!(plain.contains("Some bold and italic text"));
    }
}
