//! The master article index: the canonical ordered projection of all
//! published article summaries used by the static front-end.
//!
//! A single JSON document (`{"articles": [...]}`) sorted by publish date
//! descending, written atomically. Records with unparseable dates sort
//! with a Unix-epoch fallback so the order is always total.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::jsonld::canonical_utc_iso;
use crate::error::StorageError;
use crate::fsutil;

/// Summary projection of one published article.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleSummary {
    /// Record ID.
    pub id: String,
    /// Display title (the page H1).
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Site-relative page path (`articles/{slug}.html`).
    pub link: String,
    /// Meta description or summary line.
    #[serde(default)]
    pub summary: Option<String>,
    /// Featured image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Publish timestamp as stored on the record.
    #[serde(default)]
    pub published_iso: Option<String>,
    /// Primary topic label.
    #[serde(default)]
    pub topic: Option<String>,
    /// Relative audio path, when TTS produced one.
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct IndexDocument {
    #[serde(default)]
    articles: Vec<ArticleSummary>,
}

/// Sort key: parsed publish date, Unix epoch when unparseable.
fn sort_key(summary: &ArticleSummary) -> DateTime<Utc> {
    summary
        .published_iso
        .as_deref()
        .and_then(canonical_utc_iso)
        .and_then(|iso| DateTime::parse_from_rfc3339(&iso).ok())
        .map_or(DateTime::UNIX_EPOCH, |dt| dt.with_timezone(&Utc))
}

/// The master index file.
#[derive(Debug, Clone)]
pub struct MasterIndex {
    path: PathBuf,
}

impl MasterIndex {
    /// Open the index at `path` (usually `public/all_articles.json`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all summaries; an absent file is an empty index.
    pub fn load(&self) -> Result<Vec<ArticleSummary>, StorageError> {
        Ok(fsutil::load_json::<IndexDocument>(&self.path)?
            .unwrap_or_default()
            .articles)
    }

    /// Insert or replace the summary with the same `id`, re-sort
    /// descending by publish date, and persist atomically.
    pub fn upsert(&self, summary: ArticleSummary) -> Result<(), StorageError> {
        let mut articles = self.load()?;
        articles.retain(|a| a.id != summary.id);
        articles.push(summary);
        self.save(articles)
    }

    /// Remove the entry with the given ID. Returns whether one existed.
    pub fn remove_by_id(&self, id: &str) -> Result<bool, StorageError> {
        let mut articles = self.load()?;
        let before = articles.len();
        articles.retain(|a| a.id != id);
        let removed = articles.len() != before;
        if removed {
            self.save(articles)?;
        }
        Ok(removed)
    }

    /// Remove only the FIRST entry matching the given link path.
    /// Returns the removed entry, if any.
    pub fn remove_first_by_link(
        &self,
        link: &str,
    ) -> Result<Option<ArticleSummary>, StorageError> {
        let mut articles = self.load()?;
        let Some(pos) = articles.iter().position(|a| a.link == link) else {
            return Ok(None);
        };
        let removed = articles.remove(pos);
        self.save(articles)?;
        Ok(Some(removed))
    }

    fn save(&self, mut articles: Vec<ArticleSummary>) -> Result<(), StorageError> {
        articles.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        tracing::info!(entries = articles.len(), path = %self.path.display(), "master index saved");
        fsutil::atomic_write_json(&self.path, &IndexDocument { articles })
    }
}
