//! Title stage: generates the SEO title tag and the page H1, and derives
//! the slug.
//!
//! `final_page_h1` is set exactly once here; downstream stages read it
//! but never overwrite it.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::publish::text::{
    slugify, to_title_case, truncate_headline, SEO_H1_HARD_MAX_LEN, TITLE_TAG_HARD_MAX_LEN,
};
use crate::record::ArticleRecord;

const SYSTEM_PROMPT: &str = r#"You are an expert in SEO, persuasion psychology, and tech journalism. Craft two headline elements for the given article and output strict JSON with exactly:

- "generated_title_tag": 50-60 characters (hard limit 65). Must open with the primary keyword or a close natural variant, no leading colons.
- "generated_seo_h1": 60-70 characters (hard limit 75). Features the primary keyword prominently and must differ from the title tag.
- "title_strategy_notes": 1-2 sentences on the keyword placement and persuasion tactics used.

Write like a sharp, enthusiastic tech insider: dynamic verbs, a concrete benefit or warning, genuine curiosity. Never use bland machine-favored words like "Discover", "Explore", "Unveiling", "Delve", "Harnessing", "Leveraging", "Navigating". Title Case both headlines. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &["generated_title_tag", "generated_seo_h1"];

const MAX_SUMMARY_CONTEXT: usize = 1000;
const MAX_CONTENT_SNIPPET: usize = 200;
const BRAND_SUFFIX: &str = " - Newsroom";

/// The title generator.
pub struct TitleStage;

impl TitleStage {
    fn fallback_title_tag(primary_keyword: &str) -> String {
        truncate_headline(
            &to_title_case(&format!("Key Update on {primary_keyword}{BRAND_SUFFIX}")),
            TITLE_TAG_HARD_MAX_LEN,
        )
    }

    fn fallback_h1(primary_keyword: &str) -> String {
        truncate_headline(
            &to_title_case(&format!("Breaking News: {primary_keyword} Developments")),
            SEO_H1_HARD_MAX_LEN,
        )
    }
}

#[async_trait]
impl Stage for TitleStage {
    fn name(&self) -> &'static str {
        "title"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let primary_keyword = record
            .primary_keyword()
            .unwrap_or("Tech Insight")
            .to_string();
        let secondary: Vec<String> = record
            .final_keywords
            .iter()
            .filter(|kw| !kw.eq_ignore_ascii_case(&primary_keyword))
            .take(2)
            .cloned()
            .collect();
        let summary: String = record
            .processed_summary
            .as_deref()
            .unwrap_or("No summary provided.")
            .chars()
            .take(MAX_SUMMARY_CONTEXT)
            .collect();
        let snippet: String = record
            .raw_scraped_text
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(MAX_CONTENT_SNIPPET)
            .collect();

        let payload = payload_json(&json!({
            "primary_keyword": primary_keyword,
            "secondary_keywords": secondary,
            "processed_summary": summary,
            "article_content_snippet": snippet,
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::CreativeTitle, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        let title_tag_raw = value["generated_title_tag"].as_str().unwrap_or_default();
        let seo_h1_raw = value["generated_seo_h1"].as_str().unwrap_or_default();

        let title_tag = if title_tag_raw.trim().is_empty() {
            Self::fallback_title_tag(&primary_keyword)
        } else {
            truncate_headline(&to_title_case(title_tag_raw), TITLE_TAG_HARD_MAX_LEN)
        };
        let seo_h1 = if seo_h1_raw.trim().is_empty() {
            Self::fallback_h1(&primary_keyword)
        } else {
            truncate_headline(&to_title_case(seo_h1_raw), SEO_H1_HARD_MAX_LEN)
        };

        record.generated_title_tag = Some(title_tag);
        // The H1 is written exactly once; a re-run must not change the
        // slug an already published page lives under.
        if record.final_page_h1.is_none() {
            record.final_page_h1 = Some(seo_h1.clone());
            record.slug = Some(slugify(&seo_h1));
        }
        record.generated_seo_h1 = Some(seo_h1);

        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        let primary_keyword = record
            .primary_keyword()
            .unwrap_or("Tech Insight")
            .to_string();
        record.generated_title_tag = Some(Self::fallback_title_tag(&primary_keyword));
        let h1 = Self::fallback_h1(&primary_keyword);
        if record.final_page_h1.is_none() {
            record.final_page_h1 = Some(h1.clone());
            record.slug = Some(slugify(&h1));
        }
        record.generated_seo_h1 = Some(h1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::test_context;
    use crate::stages::{status, StageRunner};
    use std::time::Duration;

    #[tokio::test]
    async fn success_sets_h1_once_and_derives_slug() {
        let reply = serde_json::json!({
            "generated_title_tag": "New AI Chips Crush Records! See Speed Tests Now",
            "generated_seo_h1": "Warning: These New AI Chips Will Make Your PC Obsolete",
            "title_strategy_notes": "Urgency plus benefit."
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("t1");
        record.final_keywords = vec!["AI Chips".to_string()];
        record.processed_summary = Some("New chips announced.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&TitleStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("title"), Some(status::SUCCESS));
        let h1 = record.final_page_h1.clone().unwrap();
        assert!(h1.chars().count() <= SEO_H1_HARD_MAX_LEN);
        assert_eq!(record.slug.as_deref(), Some(slugify(&h1).as_str()));

        // A second run never overwrites the H1 or the slug.
        let first_h1 = h1.clone();
        let first_slug = record.slug.clone();
        StageRunner::new(Duration::from_secs(5))
            .execute(&TitleStage, &mut record, &ctx)
            .await;
        assert_eq!(record.final_page_h1, Some(first_h1));
        assert_eq!(record.slug, first_slug);
    }

    #[tokio::test]
    async fn fallback_builds_titles_from_primary_keyword() {
        let (_guard, ctx) = test_context("not json");
        let mut record = ArticleRecord::new("t2");
        record.final_keywords = vec!["Quantum Leap".to_string()];
        record.processed_summary = Some("Summary.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&TitleStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("title"), Some(status::FAILED_LLM_CALL));
        let tag = record.generated_title_tag.clone().unwrap();
        assert!(tag.contains("Quantum Leap"));
        assert!(tag.chars().count() <= TITLE_TAG_HARD_MAX_LEN);
        assert!(record.final_page_h1.is_some());
        assert!(record.slug.is_some());
    }

    #[tokio::test]
    async fn overlong_llm_titles_are_truncated() {
        let reply = serde_json::json!({
            "generated_title_tag": "An Exceptionally Long Title Tag That Blows Far Past The Hard Cap Of Sixty Five Characters Without Mercy",
            "generated_seo_h1": "An Even Longer Page Heading That Greatly Exceeds The Seventy Five Character Hard Limit Set For Page Headings",
            "title_strategy_notes": ""
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("t3");
        record.initial_title = Some("Long".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&TitleStage, &mut record, &ctx)
            .await;

        assert!(
            record.generated_title_tag.as_ref().unwrap().chars().count() <= TITLE_TAG_HARD_MAX_LEN
        );
        assert!(record.final_page_h1.as_ref().unwrap().chars().count() <= SEO_H1_HARD_MAX_LEN);
    }
}
