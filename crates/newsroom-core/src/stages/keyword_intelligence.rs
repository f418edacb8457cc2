//! Keyword intelligence stage: produces the ordered `final_keywords`
//! list with the canonical primary keyword at index 0.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::ArticleRecord;

const SYSTEM_PROMPT: &str = r#"You are an SEO keyword strategist for a technology news site. Given the article context, output strict JSON with exactly:

- "primary_keyword": the single term this article should rank for.
- "secondary_keywords": 2-4 supporting/LSI terms.
- "long_tail_keywords": 2-4 specific multi-word queries a reader would type.
- "entity_keywords": named products, companies, and people worth tagging.

Keywords must reflect what the article actually covers; never invent products or version numbers it does not mention. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "primary_keyword",
    "secondary_keywords",
    "long_tail_keywords",
    "entity_keywords",
];

const MAX_FINAL_KEYWORDS: usize = 15;

/// The keyword strategist.
pub struct KeywordIntelligenceStage;

#[async_trait]
impl Stage for KeywordIntelligenceStage {
    fn name(&self) -> &'static str {
        "keyword_intelligence"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let summary = record.processed_summary.clone().unwrap_or_default();
        let title = record.initial_title.clone().unwrap_or_default();
        if summary.is_empty() && title.is_empty() {
            return Err(StageError::InsufficientInput("no summary or title".to_string()));
        }

        let payload = payload_json(&json!({
            "title": title,
            "summary": summary,
            "primary_topic": record.primary_topic,
            "candidate_keywords": record.candidate_keywords,
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::QueryGen, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        let primary = value["primary_keyword"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();
        if primary.is_empty() {
            return Err(StageError::Other("empty primary keyword".to_string()));
        }

        let mut keywords = vec![primary];
        for group in ["secondary_keywords", "long_tail_keywords", "entity_keywords"] {
            if let Some(items) = value[group].as_array() {
                for item in items {
                    if let Some(kw) = item.as_str() {
                        let kw = kw.trim();
                        if !kw.is_empty()
                            && !keywords.iter().any(|k| k.eq_ignore_ascii_case(kw))
                        {
                            keywords.push(kw.to_string());
                        }
                    }
                }
            }
        }
        keywords.truncate(MAX_FINAL_KEYWORDS);
        record.final_keywords = keywords;

        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        // Fall back to what ingest already knew: topic first, then the
        // candidate keywords, deduplicated.
        let mut keywords = Vec::new();
        if let Some(topic) = &record.primary_topic {
            keywords.push(topic.clone());
        }
        for kw in &record.candidate_keywords {
            if !keywords.iter().any(|k: &String| k.eq_ignore_ascii_case(kw)) {
                keywords.push(kw.clone());
            }
        }
        if keywords.is_empty() {
            if let Some(title) = &record.initial_title {
                keywords.push(title.clone());
            }
        }
        keywords.truncate(MAX_FINAL_KEYWORDS);
        record.final_keywords = keywords;
    }
}
