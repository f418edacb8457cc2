//! Outline planning and per-section drafting.
//!
//! One stage, two phases: the planner produces the ordered section
//! descriptors, then each section is drafted individually so a single
//! bad generation costs one section, not the article.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleOutline, ArticleRecord, OutlineSection};

const PLANNER_SYSTEM_PROMPT: &str = r####"You are a senior content strategist planning a tech news article. Given the article context, output strict JSON with exactly:

- "article_h1_suggestion": the working H1.
- "outline_strategy_notes": 1-2 sentences on the narrative arc.
- "sections": an ordered array of 4-7 objects, each with:
  - "type": "introduction", "body_section", or "conclusion" (exactly one introduction first and one conclusion last).
  - "heading_suggestion": the markdown heading line, "##" for introduction/conclusion, "###" for body sections.
  - "writing_instructions": 1-3 sentences telling the writer what this section must cover and which facts from the source to use.

Output only the JSON object."####;

const PLANNER_EXPECT_KEYS: &[&str] = &["article_h1_suggestion", "sections"];

const WRITER_SYSTEM_PROMPT: &str = r#"You are a staff writer drafting one section of a tech news article. Output strict JSON with exactly:

- "generated_markdown": the section's markdown. It MUST begin with the exact heading line you are given, followed by a blank line. Write tight, factual prose grounded only in the provided source material. Where an illustrative image would help, insert a placeholder comment on its own line: <!-- IMAGE_PLACEHOLDER: short description of the desired image -->. Use fenced code blocks, lists, or tables only when the material calls for them.

Output only the JSON object."#;

const WRITER_EXPECT_KEYS: &[&str] = &["generated_markdown"];

const WRITER_SUCCESS: &str = "SUCCESS";
const WRITER_FAILED: &str = "FAILED_LLM_CALL";
const WRITER_EMPTY: &str = "FAILED_NO_CONTENT";

/// The outline planner + section writer.
pub struct OutlineStage;

#[async_trait]
impl Stage for OutlineStage {
    fn name(&self) -> &'static str {
        "outline"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let summary = record.processed_summary.clone().unwrap_or_default();
        let body = record.raw_scraped_text.clone().unwrap_or_default();
        if summary.is_empty() && body.trim().is_empty() {
            return Err(StageError::InsufficientInput("no source material".to_string()));
        }

        let source_excerpt: String = body.chars().take(6000).collect();
        let planner_payload = payload_json(&json!({
            "page_h1": record.final_page_h1,
            "primary_keyword": record.primary_keyword(),
            "final_keywords": record.final_keywords,
            "summary": summary,
            "source_excerpt": source_excerpt,
        }));

        let plan = ctx
            .gateway
            .call(
                ModelProfile::QueryGen,
                PLANNER_SYSTEM_PROMPT,
                &planner_payload,
                PLANNER_EXPECT_KEYS,
            )
            .await?;

        let mut outline: ArticleOutline = serde_json::from_value(plan)
            .map_err(|e| StageError::Other(format!("outline did not deserialize: {e}")))?;
        if outline.sections.is_empty() {
            return Err(StageError::Other("planner produced no sections".to_string()));
        }

        let mut failed_sections = 0usize;
        for section in &mut outline.sections {
            draft_section(section, &summary, &source_excerpt, ctx).await;
            if section.writer_status.as_deref() != Some(WRITER_SUCCESS) {
                failed_sections += 1;
            }
        }

        let total = outline.sections.len();
        record.article_outline = Some(outline);

        Ok(if failed_sections == 0 {
            super::status::SUCCESS.to_string()
        } else {
            format!("WARNING_{failed_sections}_OF_{total}_SECTIONS_FAILED")
        })
    }
}

/// Draft one section in place, recording the writer status on the
/// section itself. Writer failures never propagate.
async fn draft_section(
    section: &mut OutlineSection,
    summary: &str,
    source_excerpt: &str,
    ctx: &StageContext,
) {
    let payload = payload_json(&json!({
        "heading": section.heading_suggestion,
        "section_type": section.section_type,
        "writing_instructions": section.writing_instructions,
        "summary": summary,
        "source_excerpt": source_excerpt,
    }));

    match ctx
        .gateway
        .call(
            ModelProfile::QueryGen,
            WRITER_SYSTEM_PROMPT,
            &payload,
            WRITER_EXPECT_KEYS,
        )
        .await
    {
        Ok(value) => {
            let markdown = value["generated_markdown"].as_str().unwrap_or_default();
            if markdown.trim().is_empty() {
                tracing::warn!(heading = %section.heading_suggestion, "writer returned empty section");
                section.generated_markdown = None;
                section.writer_status = Some(WRITER_EMPTY.to_string());
            } else {
                section.generated_markdown = Some(markdown.to_string());
                section.writer_status = Some(WRITER_SUCCESS.to_string());
            }
        }
        Err(e) => {
            tracing::error!(heading = %section.heading_suggestion, error = %e, "section writer failed");
            section.generated_markdown = None;
            section.writer_status = Some(WRITER_FAILED.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::test_context;
    use crate::stages::{status, StageRunner};
    use std::time::Duration;

    // The static test provider answers both planner and writer calls with
    // the same JSON, so include both key sets.
    fn combined_reply() -> String {
        serde_json::json!({
            "article_h1_suggestion": "The B200 Story",
            "outline_strategy_notes": "Lead with the announcement, close with outlook.",
            "sections": [
                {"type": "introduction", "heading_suggestion": "## The Announcement",
                 "writing_instructions": "Open with the launch."},
                {"type": "body_section", "heading_suggestion": "### What Changed",
                 "writing_instructions": "Cover the architecture."},
                {"type": "conclusion", "heading_suggestion": "## Outlook",
                 "writing_instructions": "Close with the market view."}
            ],
            "generated_markdown": "## The Announcement\n\nNVIDIA shipped the B200."
        })
        .to_string()
    }

    #[tokio::test]
    async fn planner_and_writer_fill_every_section() {
        let (_guard, ctx) = test_context(&combined_reply());
        let mut record = ArticleRecord::new("o1");
        record.processed_summary = Some("NVIDIA unveiled the B200.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&OutlineStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("outline"), Some(status::SUCCESS));
        let outline = record.article_outline.as_ref().unwrap();
        assert_eq!(outline.sections.len(), 3);
        assert!(outline
            .sections
            .iter()
            .all(|s| s.writer_status.as_deref() == Some("SUCCESS")));
        assert!(outline.sections[0]
            .generated_markdown
            .as_ref()
            .unwrap()
            .contains("B200"));
    }

    #[tokio::test]
    async fn no_source_material_is_skipped() {
        let (_guard, ctx) = test_context(&combined_reply());
        let mut record = ArticleRecord::new("o2");

        StageRunner::new(Duration::from_secs(5))
            .execute(&OutlineStage, &mut record, &ctx)
            .await;

        assert_eq!(
            record.status("outline"),
            Some(status::SKIPPED_INSUFFICIENT_INPUT)
        );
        assert!(record.article_outline.is_none());
    }

    #[tokio::test]
    async fn planner_garbage_fails_stage() {
        let (_guard, ctx) = test_context("not json");
        let mut record = ArticleRecord::new("o3");
        record.processed_summary = Some("Summary.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&OutlineStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("outline"), Some(status::FAILED_LLM_CALL));
    }
}
