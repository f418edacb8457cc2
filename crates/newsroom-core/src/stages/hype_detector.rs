//! Hype detection stage.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, HypeAssessment};

const SYSTEM_PROMPT: &str = r#"You are a skeptical technology editor measuring how much of an article is marketing hype versus substantiated reporting. Output strict JSON with exactly:

- "hype_score": 0.0 (sober, evidence-led) to 1.0 (pure hype).
- "substantiation_level": one of "Well-Substantiated", "Partially Substantiated", "Poorly Substantiated", "Highly Unsubstantiated".
- "identified_hype_phrases_or_claims": array of quoted phrases that overreach their evidence.
- "evidence_gaps_summary": what a careful reader would still need verified.
- "overall_content_tone_evaluation": a short tone label (e.g. "Balanced but Optimistic").
- "recommendation_for_publication": one of "Proceed As Is", "Proceed with Caution (verify claims)", "Reject (Primarily Hype/PR)".

Superlatives backed by named benchmarks or primary sources are not hype; unattributed world-firsts are. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "hype_score",
    "substantiation_level",
    "identified_hype_phrases_or_claims",
    "evidence_gaps_summary",
    "overall_content_tone_evaluation",
    "recommendation_for_publication",
];

/// The hype analyzer.
pub struct HypeDetectorStage;

#[async_trait]
impl Stage for HypeDetectorStage {
    fn name(&self) -> &'static str {
        "hype_detector"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let body = record.raw_scraped_text.clone().unwrap_or_default();
        let summary = record.processed_summary.clone().unwrap_or_default();
        if body.trim().is_empty() && summary.is_empty() {
            return Err(StageError::InsufficientInput("no body or summary".to_string()));
        }

        let payload = payload_json(&json!({
            "title": record.initial_title,
            "summary": summary,
            "body_excerpt": body.chars().take(4000).collect::<String>(),
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::Analytical, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        record.hype_assessment = Some(
            serde_json::from_value(value)
                .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?,
        );
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.hype_assessment = Some(HypeAssessment {
            hype_score: 0.5,
            substantiation_level: "Partially Substantiated".to_string(),
            evidence_gaps_summary: "Upstream hype assessment missing.".to_string(),
            overall_content_tone_evaluation: "Neutral".to_string(),
            recommendation_for_publication: "Proceed with Caution (verify claims)".to_string(),
            ..Default::default()
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
            "hype_score": 0.2,
            "substantiation_level": "Well-Substantiated",
            "identified_hype_phrases_or_claims": [],
            "evidence_gaps_summary": "Claims cite official benchmarks.",
            "overall_content_tone_evaluation": "Balanced but Optimistic",
            "recommendation_for_publication": "Proceed As Is"
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("h1");
        record.raw_scraped_text = Some("Body text with claims.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&HypeDetectorStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("hype_detector"), Some(status::SUCCESS));
        assert_eq!(
            record
                .hype_assessment
                .as_ref()
                .unwrap()
                .recommendation_for_publication,
            "Proceed As Is"
        );
    }

    #[tokio::test]
    async fn fallback_recommends_caution() {
        let (_guard, ctx) = test_context("broken");
        let mut record = ArticleRecord::new("h2");
        record.raw_scraped_text = Some("Body.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&HypeDetectorStage, &mut record, &ctx)
            .await;

        let a = record.hype_assessment.as_ref().unwrap();
        assert_eq!(a.hype_score, 0.5);
        assert!(a.recommendation_for_publication.contains("Caution"));
    }
}
