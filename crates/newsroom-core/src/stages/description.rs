//! Meta description stage.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::publish::text::{truncate_at_word_boundary, META_DESC_TARGET_MAX_LEN};
use crate::record::ArticleRecord;

const SYSTEM_PROMPT: &str = r#"You are a conversion-focused SEO copywriter. Write the meta description for the given article and output strict JSON with exactly:

- "generated_meta_description": 140-155 characters, containing the primary keyword naturally, ending with an implicit reason to click. No quotes around the text, no clickbait that the article cannot cash.

Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &["generated_meta_description"];

/// The meta description generator.
pub struct DescriptionStage;

/// Normalize a raw description: collapse whitespace, then truncate at a
/// word boundary only when it exceeds the target length.
fn finalize_description(raw: &str) -> String {
    let stripped = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if stripped.chars().count() <= META_DESC_TARGET_MAX_LEN {
        return stripped;
    }
    truncate_at_word_boundary(&stripped, META_DESC_TARGET_MAX_LEN)
}

#[async_trait]
impl Stage for DescriptionStage {
    fn name(&self) -> &'static str {
        "description"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let summary = record.processed_summary.clone().unwrap_or_default();
        if summary.is_empty() && record.initial_title.is_none() {
            return Err(StageError::InsufficientInput("no summary or title".to_string()));
        }

        let payload = payload_json(&json!({
            "primary_keyword": record.primary_keyword(),
            "page_h1": record.final_page_h1,
            "summary": summary,
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::CreativeMeta, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        let raw = value["generated_meta_description"]
            .as_str()
            .unwrap_or_default();
        if raw.trim().is_empty() {
            return Err(StageError::Other("empty meta description".to_string()));
        }

        record.generated_meta_description = Some(finalize_description(raw));
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        let source = record
            .processed_summary
            .clone()
            .or_else(|| record.final_page_h1.clone())
            .or_else(|| record.initial_title.clone())
            .unwrap_or_else(|| "Technology news and analysis.".to_string());
        record.generated_meta_description = Some(finalize_description(&source));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::text::META_DESC_HARD_MAX_LEN;
    use crate::stages::testing::test_context;
    use crate::stages::{status, StageRunner};
    use std::time::Duration;

    #[test]
    fn short_raw_passes_through_stripped() {
        let raw = "  NVIDIA's B200   sets a new bar for AI compute.  ";
        assert_eq!(
            finalize_description(raw),
            "NVIDIA's B200 sets a new bar for AI compute."
        );
    }

    #[test]
    fn long_raw_is_bounded_by_hard_max() {
        let raw = "very long description ".repeat(20);
        let out = finalize_description(&raw);
        assert!(out.chars().count() <= META_DESC_HARD_MAX_LEN);
        assert!(out.ends_with("..."));
    }

    #[tokio::test]
    async fn success_writes_description() {
        let reply = serde_json::json!({
            "generated_meta_description":
                "NVIDIA's Blackwell B200 GPU sets a new standard in AI supercomputing, \
                 offering unprecedented power for training frontier models."
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("d1");
        record.processed_summary = Some("NVIDIA unveiled the B200.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&DescriptionStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("description"), Some(status::SUCCESS));
        assert!(record
            .generated_meta_description
            .as_ref()
            .unwrap()
            .contains("Blackwell"));
    }

    #[tokio::test]
    async fn fallback_derives_from_summary() {
        let (_guard, ctx) = test_context("nope");
        let mut record = ArticleRecord::new("d2");
        record.processed_summary = Some("A short summary of the piece.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&DescriptionStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("description"), Some(status::FAILED_LLM_CALL));
        assert_eq!(
            record.generated_meta_description.as_deref(),
            Some("A short summary of the piece.")
        );
    }
}
