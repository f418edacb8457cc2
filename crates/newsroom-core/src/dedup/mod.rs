//! Content-similarity deduplication engine.
//!
//! Persists prior article fingerprints as a single JSON document and
//! classifies incoming records against the full history. The classify +
//! insert window runs under one async mutex so two workers can never both
//! store the same near-duplicate pair as unique.

pub mod text;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::DedupConfig;
use crate::embedding::Embedder;
use crate::error::StorageError;
use crate::fsutil;
use crate::record::NearDuplicate;
use self::text::{advanced_text_cleaner, char_prefix, cosine_similarity};

/// A stored article fingerprint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingEntry {
    /// The fingerprint vector.
    pub embedding: Vec<f32>,
    /// Title excerpt for human inspection of the store (first 150 chars).
    pub title: String,
    /// When this entry was added.
    pub date_added_utc: DateTime<Utc>,
}

/// Stored value: current format or a legacy bare vector.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum StoredEntry {
    Full(EmbeddingEntry),
    Legacy(Vec<f32>),
}

impl StoredEntry {
    fn vector(&self) -> &[f32] {
        match self {
            Self::Full(entry) => &entry.embedding,
            Self::Legacy(vec) => vec,
        }
    }
}

/// Classification verdict for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupVerdict {
    /// Cleaned fingerprint text was below the minimum length.
    SkippedTextTooShort {
        /// Length of the cleaned text.
        chars: usize,
    },
    /// The embedder failed or declined to produce a vector.
    FailedEmbedding,
    /// First article ever seen; stored.
    UniqueNoHistory,
    /// No stored entry reached the near-duplicate threshold; stored.
    Unique,
    /// At least one stored entry reached the near-duplicate threshold but
    /// none reached the hard-duplicate threshold; stored.
    NearDuplicate,
    /// A stored entry reached the hard-duplicate threshold; NOT stored.
    Duplicate {
        /// ID of the matched entry.
        of: String,
    },
}

/// Full classification outcome applied to the article record.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// The verdict.
    pub verdict: DedupVerdict,
    /// ID of the most similar stored entry, if any comparison ran.
    pub highest_similar_article_id: Option<String>,
    /// Similarity to that entry.
    pub similarity_score_to_highest: f32,
    /// Top-3 near-duplicates by score (the hard match excluded when the
    /// record is a duplicate).
    pub near_duplicates_found: Vec<NearDuplicate>,
}

impl DedupOutcome {
    /// Whether the record is a hard duplicate.
    pub fn is_duplicate(&self) -> bool {
        matches!(self.verdict, DedupVerdict::Duplicate { .. })
    }

    /// Status string written to the record, carrying match detail.
    pub fn status_string(&self) -> String {
        match &self.verdict {
            DedupVerdict::SkippedTextTooShort { chars } => {
                format!("SKIPPED_TEXT_TOO_SHORT_{chars}chars")
            }
            DedupVerdict::FailedEmbedding => "FAILED_EMBEDDING_CURRENT".to_string(),
            DedupVerdict::UniqueNoHistory => "UNIQUE_NO_HISTORY".to_string(),
            DedupVerdict::Unique => format!(
                "UNIQUE_HIGHEST_SIM_{:.2}",
                self.similarity_score_to_highest
            ),
            DedupVerdict::NearDuplicate => format!(
                "NEAR_DUPLICATE_HIGHEST_WITH_{}_{:.2}",
                self.highest_similar_article_id.as_deref().unwrap_or("unknown"),
                self.similarity_score_to_highest
            ),
            DedupVerdict::Duplicate { of } => format!("DUPLICATE_OF_{of}"),
        }
    }
}

/// Fingerprint source material for one record.
#[derive(Debug, Clone, Default)]
pub struct FingerprintInput<'a> {
    /// Record ID (skipped during self-comparison).
    pub id: &'a str,
    /// Best available title.
    pub title: &'a str,
    /// Best available summary.
    pub summary: &'a str,
    /// Raw scraped body text.
    pub raw_text: &'a str,
}

/// The persistent duplicate store.
pub struct DuplicateStore {
    path: PathBuf,
    config: DedupConfig,
    embedder: Arc<dyn Embedder>,
    // Guard spans the whole classify+insert window.
    entries: Mutex<BTreeMap<String, StoredEntry>>,
}

impl DuplicateStore {
    /// Open the store at `path`, loading any existing history.
    pub fn open(
        path: impl Into<PathBuf>,
        config: DedupConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let entries: BTreeMap<String, StoredEntry> =
            fsutil::load_json(&path)?.unwrap_or_default();
        tracing::info!(entries = entries.len(), path = %path.display(), "duplicate store opened");
        Ok(Self {
            path,
            config,
            embedder,
            entries: Mutex::new(entries),
        })
    }

    /// Number of stored fingerprints.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store holds no fingerprints.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Remove a fingerprint (used by the delete tool).
    pub async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(id).is_some();
        if removed {
            fsutil::atomic_write_json(&self.path, &*entries)?;
        }
        Ok(removed)
    }

    /// Build the normalized fingerprint text for a record.
    fn fingerprint_text(&self, input: &FingerprintInput<'_>) -> String {
        let raw_trimmed = input.raw_text.trim();
        let body_snippet = if raw_trimmed.len() > 20 {
            format!(
                "{}...",
                char_prefix(raw_trimmed, self.config.max_text_snippet)
            )
        } else {
            String::new()
        };

        let combined = [input.title, input.summary, &body_snippet]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(". ");

        advanced_text_cleaner(&combined)
    }

    /// Classify a record against the full history and, unless it is a hard
    /// duplicate, insert its fingerprint.
    ///
    /// The whole read-compare-insert sequence holds the store lock so
    /// concurrent workers serialize here.
    pub async fn classify(
        &self,
        input: FingerprintInput<'_>,
    ) -> Result<DedupOutcome, StorageError> {
        let cleaned = self.fingerprint_text(&input);

        if cleaned.len() < self.config.min_text_length {
            tracing::warn!(
                id = %input.id,
                chars = cleaned.len(),
                min = self.config.min_text_length,
                "dedup skipped: text too short after cleaning",
            );
            return Ok(DedupOutcome {
                verdict: DedupVerdict::SkippedTextTooShort {
                    chars: cleaned.len(),
                },
                highest_similar_article_id: None,
                similarity_score_to_highest: 0.0,
                near_duplicates_found: Vec::new(),
            });
        }

        let embedding = match self.embedder.embed(&cleaned).await {
            Ok(Some(vector)) => vector,
            Ok(None) => {
                return Ok(DedupOutcome {
                    verdict: DedupVerdict::FailedEmbedding,
                    highest_similar_article_id: None,
                    similarity_score_to_highest: 0.0,
                    near_duplicates_found: Vec::new(),
                })
            }
            Err(e) => {
                tracing::error!(id = %input.id, error = %e, "dedup embedding failed");
                return Ok(DedupOutcome {
                    verdict: DedupVerdict::FailedEmbedding,
                    highest_similar_article_id: None,
                    similarity_score_to_highest: 0.0,
                    near_duplicates_found: Vec::new(),
                });
            }
        };

        let mut entries = self.entries.lock().await;

        if entries.is_empty() {
            entries.insert(
                input.id.to_string(),
                StoredEntry::Full(Self::entry(&embedding, input.title)),
            );
            fsutil::atomic_write_json(&self.path, &*entries)?;
            tracing::info!(id = %input.id, "no history; stored as first fingerprint");
            return Ok(DedupOutcome {
                verdict: DedupVerdict::UniqueNoHistory,
                highest_similar_article_id: None,
                similarity_score_to_highest: 0.0,
                near_duplicates_found: Vec::new(),
            });
        }

        let mut highest_sim = 0.0f32;
        let mut highest_id: Option<String> = None;
        let mut duplicate_of: Option<String> = None;
        let mut near_hits: Vec<NearDuplicate> = Vec::new();

        for (hist_id, stored) in entries.iter() {
            if hist_id == input.id {
                continue;
            }
            let similarity = cosine_similarity(&embedding, stored.vector());

            if similarity > highest_sim {
                highest_sim = similarity;
                highest_id = Some(hist_id.clone());
            }

            if similarity >= self.config.threshold_duplicate {
                tracing::warn!(
                    id = %input.id,
                    matched = %hist_id,
                    similarity,
                    "hard duplicate detected",
                );
                duplicate_of = Some(hist_id.clone());
            } else if similarity >= self.config.threshold_near_duplicate {
                near_hits.push(NearDuplicate {
                    id: hist_id.clone(),
                    score: similarity,
                });
            }
        }

        near_hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let outcome = if let Some(of) = duplicate_of {
            // The hard match is reported separately; keep only other hits.
            let near = near_hits
                .into_iter()
                .filter(|n| Some(n.id.as_str()) != highest_id.as_deref())
                .take(3)
                .collect();
            DedupOutcome {
                verdict: DedupVerdict::Duplicate { of },
                highest_similar_article_id: highest_id,
                similarity_score_to_highest: highest_sim,
                near_duplicates_found: near,
            }
        } else if !near_hits.is_empty() {
            DedupOutcome {
                verdict: DedupVerdict::NearDuplicate,
                highest_similar_article_id: highest_id,
                similarity_score_to_highest: highest_sim,
                near_duplicates_found: near_hits.into_iter().take(3).collect(),
            }
        } else {
            tracing::info!(
                id = %input.id,
                highest_sim,
                "unique; highest similarity below near-duplicate threshold",
            );
            DedupOutcome {
                verdict: DedupVerdict::Unique,
                highest_similar_article_id: highest_id,
                similarity_score_to_highest: highest_sim,
                near_duplicates_found: Vec::new(),
            }
        };

        // Hard duplicates are never stored; everything else is.
        if !outcome.is_duplicate() {
            entries.insert(
                input.id.to_string(),
                StoredEntry::Full(Self::entry(&embedding, input.title)),
            );
            fsutil::atomic_write_json(&self.path, &*entries)?;
        }

        Ok(outcome)
    }

    fn entry(embedding: &[f32], title: &str) -> EmbeddingEntry {
        EmbeddingEntry {
            embedding: embedding.to_vec(),
            title: char_prefix(title, 150).to_string(),
            date_added_utc: Utc::now(),
        }
    }
}
