//! Media placeholder integration.
//!
//! Replaces `<!-- IMAGE_PLACEHOLDER: ... -->` comments in the assembled
//! body with image + caption markdown. Matching is exact on normalized
//! descriptions first, then falls back to an alphanumeric-only key.
//! Candidates may be reused across duplicate placeholders up to a cap;
//! unmatched placeholders stay in the output as comments.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::CaptionStyle;
use crate::record::MediaCandidate;

/// Maximum times one candidate may satisfy different placeholders.
pub const MAX_REUSE_COUNT_PER_CANDIDATE: usize = 2;

/// Maximum caption length after flattening.
const MAX_CAPTION_LENGTH: usize = 250;

/// Captions that carry no information and are suppressed.
const TRIVIAL_CAPTIONS: &[&str] = &["n/a", "analysis n/a", "image selected based on search query match."];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(<!--\s*IMAGE_PLACEHOLDER:\s*(.*?)\s*-->)").expect("valid regex")
    })
}

fn line_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*(?:[-*+>]\s*|\d+\.\s+)?)").expect("valid regex"))
}

/// Normalize a placeholder description: lowercase, strip punctuation,
/// collapse whitespace.
fn normalize_description(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let without_punct: String = lowered
        .chars()
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect();
    without_punct.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fuzzy key: ascii alphanumerics only.
fn alnum_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// One integration decision, for inspection and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationEntry {
    /// A placeholder was resolved to an image.
    Integrated {
        /// The placeholder description.
        description: String,
        /// The image URL used.
        image_url: String,
        /// "exact" or "fuzzy_alnum".
        match_type: &'static str,
        /// Whether the candidate had already been used.
        reused: bool,
    },
    /// No candidate matched; the comment stays in the output.
    Unmatched {
        /// The placeholder description.
        description: String,
    },
}

/// Outcome of one integration pass.
#[derive(Debug, Clone)]
pub struct IntegrationReport {
    /// The body with placeholders resolved.
    pub body: String,
    /// Status string for the record.
    pub status: String,
    /// Per-placeholder decisions in document order.
    pub entries: Vec<IntegrationEntry>,
}

/// Render a caption in the configured style.
fn caption_markdown(caption: &str, style: CaptionStyle) -> String {
    match style {
        CaptionStyle::MarkdownItalic => format!("*{caption}*"),
        CaptionStyle::HtmlFigcaption => format!("<figcaption>{caption}</figcaption>"),
        CaptionStyle::Plain => caption.to_string(),
    }
}

/// Whether a vision-model caption is worth emitting next to the alt text.
fn caption_is_substantial(caption: &str, alt_text: &str) -> bool {
    let trimmed = caption.trim();
    if trimmed.len() <= 10 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if TRIVIAL_CAPTIONS.contains(&lower.as_str()) {
        return false;
    }
    if lower.contains("placeholder") || lower.contains("simulated") {
        return false;
    }
    let alt_lower = alt_text.to_lowercase();
    if lower == alt_lower || lower.contains(&alt_lower) {
        return false;
    }
    true
}

struct IndexedCandidate {
    candidate: MediaCandidate,
    normalized: String,
    alnum: String,
}

/// Integrate media candidates into the markdown body.
pub fn integrate_media(
    body: &str,
    candidates: &[MediaCandidate],
    caption_style: CaptionStyle,
) -> IntegrationReport {
    let total_placeholders = placeholder_re().captures_iter(body).count();

    if body.trim().is_empty() {
        return IntegrationReport {
            body: body.to_string(),
            status: "SKIPPED_NO_MARKDOWN_BODY".to_string(),
            entries: Vec::new(),
        };
    }

    if candidates.is_empty() {
        let status = if total_placeholders > 0 {
            "WARNING_PLACEHOLDERS_NO_CANDIDATES"
        } else {
            "NO_PLACEHOLDERS_AND_NO_CANDIDATES"
        };
        return IntegrationReport {
            body: body.to_string(),
            status: status.to_string(),
            entries: Vec::new(),
        };
    }

    let indexed: Vec<IndexedCandidate> = candidates
        .iter()
        .map(|c| {
            let normalized = normalize_description(&c.description);
            IndexedCandidate {
                alnum: alnum_key(&normalized),
                normalized,
                candidate: c.clone(),
            }
        })
        .collect();

    let mut use_counts: HashMap<usize, usize> = HashMap::new();
    let mut entries = Vec::new();
    let mut integrations = 0usize;
    let mut out_lines: Vec<String> = Vec::new();

    for line in body.split_inclusive('\n') {
        let (content, ending) = split_line_ending(line);
        let Some(caps) = placeholder_re().captures(content) else {
            out_lines.push(line.to_string());
            continue;
        };

        let full_comment = caps.get(1).expect("group 1").as_str().to_string();
        let description = caps.get(2).expect("group 2").as_str().trim().to_string();
        let normalized = normalize_description(&description);
        let fuzzy = alnum_key(&normalized);

        let usable = |idx: usize| use_counts.get(&idx).copied().unwrap_or(0) < MAX_REUSE_COUNT_PER_CANDIDATE;

        let exact = indexed
            .iter()
            .enumerate()
            .find(|(idx, c)| usable(*idx) && c.normalized == normalized)
            .map(|(idx, c)| (idx, c, "exact"));
        let matched = exact.or_else(|| {
            indexed
                .iter()
                .enumerate()
                .find(|(idx, c)| usable(*idx) && !fuzzy.is_empty() && c.alnum == fuzzy)
                .map(|(idx, c)| (idx, c, "fuzzy_alnum"))
        });

        let Some((idx, hit, match_type)) = matched else {
            tracing::warn!(description = %description, "no matching media candidate");
            entries.push(IntegrationEntry::Unmatched { description });
            out_lines.push(line.to_string());
            continue;
        };

        if hit.candidate.image_url.is_empty() {
            tracing::warn!(description = %description, "matched candidate has no image URL");
            entries.push(IntegrationEntry::Unmatched { description });
            out_lines.push(line.to_string());
            continue;
        }

        let reused = use_counts.contains_key(&idx);
        *use_counts.entry(idx).or_insert(0) += 1;
        integrations += 1;

        let alt = hit
            .candidate
            .alt_text
            .replace('"', "'")
            .replace('[', "(")
            .replace(']', ")")
            .trim()
            .to_string();
        let alt = if alt.is_empty() {
            format!("Image: {}", description.chars().take(50).collect::<String>())
        } else {
            alt
        };
        let image_tag = format!("![{alt}]({})", hit.candidate.image_url);

        let caption = hit
            .candidate
            .vlm_caption
            .as_deref()
            .filter(|c| caption_is_substantial(c, &alt))
            .map(|c| {
                let flattened: String = c.trim().replace('\n', " ").chars().take(MAX_CAPTION_LENGTH).collect();
                caption_markdown(&flattened, caption_style)
            });

        let is_standalone = content.trim() == full_comment;
        let new_content = if is_standalone {
            let prefix_raw = line_prefix_re()
                .captures(content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or("");
            let mut prefix = prefix_raw.trim_end().to_string();
            if prefix.ends_with('>') {
                prefix.push(' ');
            } else if !prefix.is_empty() {
                // Keep a separator after list markers trimmed above.
                prefix.push(' ');
            }
            match &caption {
                Some(cap) => format!("{prefix}{image_tag}\n{prefix}{cap}"),
                None => format!("{prefix}{image_tag}"),
            }
        } else {
            let inline = match &caption {
                Some(cap) => format!("{image_tag} {cap}"),
                None => image_tag.clone(),
            };
            content.replacen(&full_comment, &inline, 1)
        };

        tracing::info!(
            description = %description,
            image_url = %hit.candidate.image_url,
            match_type,
            reused,
            "integrated image",
        );
        entries.push(IntegrationEntry::Integrated {
            description,
            image_url: hit.candidate.image_url.clone(),
            match_type,
            reused,
        });
        out_lines.push(format!("{new_content}{ending}"));
    }

    let final_body: String = out_lines.concat();
    let remaining = placeholder_re().captures_iter(&final_body).count();

    let status = if integrations > 0 && remaining == 0 {
        format!("SUCCESS_INTEGRATED_{integrations}_IMAGES_ALL")
    } else if integrations > 0 {
        format!("SUCCESS_PARTIAL_{integrations}_IMAGES_{remaining}_REMAIN")
    } else if total_placeholders > 0 {
        "NO_MATCHES_PH_EXIST".to_string()
    } else {
        "NO_PH_NO_INTEGRATIONS".to_string()
    };

    IntegrationReport {
        body: final_body,
        status,
        entries,
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = line.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (line, "")
    }
}
