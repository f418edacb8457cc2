//! Deduplication stage: classifies the record against the duplicate
//! store and writes the verdict fields.

use async_trait::async_trait;

use super::{Stage, StageContext, StageError};
use crate::dedup::FingerprintInput;
use crate::record::ArticleRecord;

/// Stage wrapper over the duplicate store.
pub struct DedupStage;

#[async_trait]
impl Stage for DedupStage {
    fn name(&self) -> &'static str {
        "dedup"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let title = record
            .initial_title
            .as_deref()
            .or(record.final_page_h1.as_deref())
            .unwrap_or_default()
            .to_string();
        let summary = record
            .processed_summary
            .as_deref()
            .or(record.summary.as_deref())
            .unwrap_or_default()
            .to_string();
        let raw_text = record.raw_scraped_text.clone().unwrap_or_default();

        let outcome = ctx
            .duplicates
            .classify(FingerprintInput {
                id: &record.id,
                title: &title,
                summary: &summary,
                raw_text: &raw_text,
            })
            .await
            .map_err(|e| StageError::Other(e.to_string()))?;

        record.is_duplicate = outcome.is_duplicate();
        record.highest_similar_article_id = outcome.highest_similar_article_id.clone();
        record.similarity_score_to_highest = outcome.similarity_score_to_highest;
        record.near_duplicates_found = outcome.near_duplicates_found.clone();

        Ok(outcome.status_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        // A failed classification is treated as not-a-duplicate so the
        // article is not silently dropped.
        record.is_duplicate = false;
        record.near_duplicates_found.clear();
        record.similarity_score_to_highest = 0.0;
        record.highest_similar_article_id = None;
    }
}
