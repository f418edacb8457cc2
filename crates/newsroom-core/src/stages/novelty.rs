//! Novelty assessment stage.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, NoveltyAssessment};

const SYSTEM_PROMPT: &str = r#"You are a technology analyst assessing how genuinely novel a reported development is. Given the article context, output strict JSON with exactly:

- "novelty_level": one of "Revolutionary", "Significant", "Incremental", "None".
- "novelty_confidence": 0.0-1.0.
- "breakthrough_evidence": array of concrete, verifiable claims supporting a breakthrough reading (empty when there are none).

"Revolutionary" is reserved for capability jumps that reset expectations in a field. Marketing language alone never raises the level. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &["novelty_level", "novelty_confidence", "breakthrough_evidence"];

/// The novelty analyzer.
pub struct NoveltyStage;

#[async_trait]
impl Stage for NoveltyStage {
    fn name(&self) -> &'static str {
        "novelty"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let summary = record.processed_summary.clone().unwrap_or_default();
        if summary.is_empty() && record.raw_scraped_text.is_none() {
            return Err(StageError::InsufficientInput("no summary or body".to_string()));
        }

        let prior = record
            .editorial_prime_assessment
            .as_ref()
            .map(|a| a.preliminary_novelty_impact_statement.clone())
            .unwrap_or_default();

        let payload = payload_json(&json!({
            "title": record.initial_title,
            "summary": summary,
            "preliminary_novelty_impact_statement": prior,
            "body_excerpt": record
                .raw_scraped_text
                .as_deref()
                .map(|t| t.chars().take(2500).collect::<String>()),
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::Analytical, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        record.novelty_assessment = Some(
            serde_json::from_value(value)
                .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?,
        );
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.novelty_assessment = Some(NoveltyAssessment {
            novelty_level: "None".to_string(),
            novelty_confidence: 0.0,
            breakthrough_evidence: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::test_context;
    use crate::stages::{status, StageRunner};
    use std::time::Duration;

    #[tokio::test]
    async fn success_parses_assessment() {
        let reply = serde_json::json!({
            "novelty_level": "Revolutionary",
            "novelty_confidence": 0.95,
            "breakthrough_evidence": ["1000x performance increase"]
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("n1");
        record.processed_summary = Some("A real capability jump.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&NoveltyStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("novelty"), Some(status::SUCCESS));
        let a = record.novelty_assessment.as_ref().unwrap();
        assert_eq!(a.novelty_level, "Revolutionary");
        assert!((a.novelty_confidence - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn schema_incomplete_falls_back_to_none() {
        let (_guard, ctx) = test_context(r#"{"novelty_level": "Significant"}"#);
        let mut record = ArticleRecord::new("n2");
        record.processed_summary = Some("Summary.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&NoveltyStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("novelty"), Some(status::FAILED_LLM_CALL));
        assert_eq!(
            record.novelty_assessment.as_ref().unwrap().novelty_level,
            "None"
        );
    }
}
