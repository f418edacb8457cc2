//! JSON-LD `NewsArticle` synthesis per schema.org and search-engine
//! structured-data rules.
//!
//! Dates must be timezone-aware UTC ISO-8601; unparseable dates are
//! omitted, and `dateModified` is never emitted without `datePublished`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};

use super::text::{slugify, strip_markdown, truncate_at_word_boundary};
use crate::config::SiteConfig;
use crate::record::ArticleRecord;

/// Maximum characters of plain-text article body embedded in the object.
const MAX_ARTICLE_BODY: usize = 3000;

/// Maximum keywords embedded in the object.
const MAX_KEYWORDS: usize = 15;

/// Parse a source-provided timestamp into a canonical UTC ISO-8601
/// string. Naive timestamps are assumed UTC; garbage yields `None`.
pub fn canonical_utc_iso(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    None
}

/// Synthesize the `NewsArticle` JSON-LD object for a record.
pub fn generate_news_article_json_ld(record: &ArticleRecord, site: &SiteConfig) -> Value {
    // Headline preference chain ending at the definitive page H1.
    let headline = record
        .final_page_h1
        .as_deref()
        .or(record.generated_seo_h1.as_deref())
        .or(record.initial_title.as_deref())
        .unwrap_or("Untitled Tech Article");
    if record.final_page_h1.is_none() {
        tracing::warn!(id = %record.id, "JSON-LD headline using fallback source");
    }

    let slug = record
        .slug
        .clone()
        .unwrap_or_else(|| slugify(headline));
    let canonical_url = format!("{}/articles/{slug}.html", site.base_url.trim_end_matches('/'));

    let body_md = record
        .generated_article_body_md_final
        .as_deref()
        .or(record.assembled_article_body_md.as_deref())
        .unwrap_or_default();
    let plain_text = strip_markdown(body_md);
    let word_count = plain_text.split_whitespace().count();
    let article_body = truncate_at_word_boundary(&plain_text, MAX_ARTICLE_BODY);

    let description = record
        .generated_meta_description
        .clone()
        .unwrap_or_else(|| headline.chars().take(160).collect());

    let mut object = json!({
        "@context": "https://schema.org",
        "@type": "NewsArticle",
        "headline": headline,
        "mainEntityOfPage": {
            "@type": "WebPage",
            "@id": canonical_url,
        },
        "author": {"@type": "Person", "name": site.author_name},
        "publisher": {
            "@type": "Organization",
            "name": site.name,
            "logo": {"@type": "ImageObject", "url": site.logo_url},
        },
        "description": description,
        "articleBody": article_body,
        "wordCount": word_count,
        "isPartOf": {"@type": "WebSite", "name": site.name, "url": site.base_url},
    });
    let map = object.as_object_mut().expect("object literal");

    let keywords: Vec<&String> = record.final_keywords.iter().take(MAX_KEYWORDS).collect();
    if !keywords.is_empty() {
        map.insert("keywords".to_string(), json!(keywords));
    }

    let date_published = record
        .published_iso_utc
        .as_deref()
        .and_then(canonical_utc_iso);
    match date_published {
        Some(published) => {
            map.insert("datePublished".to_string(), json!(published));
            // No separate modification tracking; modified mirrors published.
            map.insert("dateModified".to_string(), json!(published));
        }
        None => {
            if record.published_iso_utc.is_some() {
                tracing::warn!(id = %record.id, "unparseable publish date; omitting date fields");
            }
        }
    }

    if let Some(image_url) = record
        .selected_image_url
        .as_deref()
        .filter(|u| u.starts_with("http"))
    {
        map.insert(
            "image".to_string(),
            json!([{ "@type": "ImageObject", "url": image_url }]),
        );
    }

    if let Some(topic) = record.primary_topic.as_deref().filter(|t| !t.is_empty()) {
        map.insert("about".to_string(), json!([{ "@type": "Thing", "name": topic }]));
    }

    object
}
