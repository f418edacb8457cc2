//! Candidate ingest: turning raw research documents (from feeds, web
//! discovery, or the manual pick tool) into article records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{ResearchConfig, StorageConfig};
use crate::error::StorageError;
use crate::fsutil;
use crate::publish::jsonld::canonical_utc_iso;
use crate::record::ArticleRecord;

/// Processing marker on freshly written raw documents.
pub const STATUS_PENDING: &str = "pending_full_processing";

/// Manual importance levels accepted by the pick tool.
pub const IMPORTANCE_LEVELS: &[&str] = &["Interesting", "Important", "Breaking"];

/// A raw ingest document (`data/raw_web_research/{id}.json`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawResearchDoc {
    /// Stable ID derived from the normalized source URL.
    pub id: String,

    /// Source URL.
    pub original_source_url: String,

    /// Title as discovered or supplied.
    #[serde(default)]
    pub initial_title: Option<String>,

    /// Scraped body text, when the scraper has run.
    #[serde(default)]
    pub raw_scraped_text: Option<String>,

    /// Source-provided summary.
    #[serde(default)]
    pub summary: Option<String>,

    /// Publication timestamp as reported by the source.
    #[serde(default)]
    pub published_iso_utc: Option<String>,

    /// Featured image URL, when supplied.
    #[serde(default)]
    pub selected_image_url: Option<String>,

    /// Topic assigned at discovery time.
    #[serde(default)]
    pub primary_topic: Option<String>,

    /// Discovery-time keyword candidates.
    #[serde(default)]
    pub candidate_keywords: Vec<String>,

    /// Importance assigned by the manual pick tool.
    #[serde(default)]
    pub manual_priority_importance: Option<String>,

    /// Trending flag assigned by the manual pick tool.
    #[serde(default)]
    pub manual_is_trending: bool,

    /// Ingest lifecycle marker.
    #[serde(default)]
    pub processing_status: String,
}

/// Derive the stable article ID for a source URL: the first 16 hex chars
/// of the sha256 of the normalized URL.
pub fn article_id_for_url(url: &str) -> String {
    let normalized = url
        .trim()
        .trim_end_matches('/')
        .to_lowercase()
        .replace("https://", "")
        .replace("http://", "")
        .replace("www.", "");
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Build a raw research document for a manually picked URL.
///
/// `Breaking` importance implies the trending flag.
pub fn manual_pick_doc(
    url: &str,
    title: Option<&str>,
    importance: &str,
    trending: bool,
    image_url: Option<&str>,
) -> RawResearchDoc {
    let trending = trending || importance == "Breaking";
    RawResearchDoc {
        id: article_id_for_url(url),
        original_source_url: url.to_string(),
        initial_title: title.map(str::to_string),
        selected_image_url: image_url.map(str::to_string),
        manual_priority_importance: Some(importance.to_string()),
        manual_is_trending: trending,
        published_iso_utc: Some(Utc::now().to_rfc3339()),
        processing_status: STATUS_PENDING.to_string(),
        ..Default::default()
    }
}

/// Persist a raw research document under `data/raw_web_research/`.
pub fn save_raw_doc(storage: &StorageConfig, doc: &RawResearchDoc) -> Result<(), StorageError> {
    let path = storage.raw_web_research_dir().join(format!("{}.json", doc.id));
    fsutil::atomic_write_json(&path, doc)
}

/// Whether a candidate is fresh enough to process.
///
/// Candidates with no parseable publish date are kept; manual picks
/// always pass (the editor asked for them).
pub fn passes_age_filter(doc: &RawResearchDoc, research: &ResearchConfig, now: DateTime<Utc>) -> bool {
    if doc.manual_priority_importance.is_some() {
        return true;
    }
    let Some(published) = doc
        .published_iso_utc
        .as_deref()
        .and_then(canonical_utc_iso)
        .and_then(|iso| DateTime::parse_from_rfc3339(&iso).ok())
    else {
        return true;
    };
    let age = now.signed_duration_since(published.with_timezone(&Utc));
    age <= Duration::hours(i64::from(research.max_article_age_hours))
}

/// Convert a raw research document into a fresh article record.
pub fn record_from_doc(doc: &RawResearchDoc) -> ArticleRecord {
    let mut record = ArticleRecord::new(doc.id.clone());
    record.original_source_url = Some(doc.original_source_url.clone());
    record.initial_title = doc.initial_title.clone();
    record.raw_scraped_text = doc.raw_scraped_text.clone();
    record.summary = doc.summary.clone();
    record.published_iso_utc = doc.published_iso_utc.clone();
    record.selected_image_url = doc.selected_image_url.clone();
    record.primary_topic = doc.primary_topic.clone();
    record.candidate_keywords = doc.candidate_keywords.clone();
    record.manual_priority_importance = doc.manual_priority_importance.clone();
    record.manual_is_trending = doc.manual_is_trending;
    record
}

/// Load every pending raw document, applying the age filter.
pub fn load_pending_docs(
    storage: &StorageConfig,
    research: &ResearchConfig,
) -> Result<Vec<RawResearchDoc>, StorageError> {
    let dir = storage.raw_web_research_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: dir.display().to_string(),
                source,
            })
        }
    };

    let now = Utc::now();
    let mut docs = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match fsutil::load_json::<RawResearchDoc>(&path) {
            Ok(Some(doc)) => {
                if !passes_age_filter(&doc, research, now) {
                    tracing::info!(id = %doc.id, "candidate discarded by age filter");
                    continue;
                }
                docs.push(doc);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "skipping unreadable raw doc");
            }
        }
    }
    docs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_across_url_cosmetics() {
        let a = article_id_for_url("https://www.example.com/story/");
        let b = article_id_for_url("http://example.com/story");
        let c = article_id_for_url("HTTPS://EXAMPLE.COM/STORY");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn different_urls_get_different_ids() {
        assert_ne!(
            article_id_for_url("https://example.com/a"),
            article_id_for_url("https://example.com/b")
        );
    }

    #[test]
    fn breaking_importance_implies_trending() {
        let doc = manual_pick_doc("https://example.com/x", None, "Breaking", false, None);
        assert!(doc.manual_is_trending);

        let doc = manual_pick_doc("https://example.com/x", None, "Interesting", false, None);
        assert!(!doc.manual_is_trending);
    }

    #[test]
    fn age_filter_drops_stale_auto_candidates_but_keeps_picks() {
        let research = ResearchConfig::default();
        let now = Utc::now();
        let stale_date = (now - Duration::hours(100)).to_rfc3339();

        let mut auto = RawResearchDoc {
            id: "x".to_string(),
            original_source_url: "https://example.com".to_string(),
            published_iso_utc: Some(stale_date.clone()),
            ..Default::default()
        };
        assert!(!passes_age_filter(&auto, &research, now));

        auto.manual_priority_importance = Some("Important".to_string());
        assert!(passes_age_filter(&auto, &research, now));

        let undated = RawResearchDoc {
            id: "y".to_string(),
            original_source_url: "https://example.com".to_string(),
            ..Default::default()
        };
        assert!(passes_age_filter(&undated, &research, now));
    }

    #[test]
    fn raw_doc_round_trip_and_pending_scan() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().join("data"),
            public_dir: dir.path().join("public"),
        };

        let doc = manual_pick_doc(
            "https://example.com/story",
            Some("A Story"),
            "Important",
            false,
            Some("https://example.com/img.jpg"),
        );
        save_raw_doc(&storage, &doc).unwrap();

        let loaded = load_pending_docs(&storage, &ResearchConfig::default()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].initial_title.as_deref(), Some("A Story"));
        assert_eq!(loaded[0].processing_status, STATUS_PENDING);
    }

    #[test]
    fn record_carries_over_doc_fields() {
        let doc = manual_pick_doc("https://example.com/s", Some("T"), "Breaking", false, None);
        let record = record_from_doc(&doc);
        assert_eq!(record.id, doc.id);
        assert_eq!(record.initial_title.as_deref(), Some("T"));
        assert!(record.manual_is_trending);
        assert!(record.retrieved_at_utc.is_some());
    }
}
