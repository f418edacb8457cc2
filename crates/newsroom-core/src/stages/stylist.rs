//! Style and sophistication assessment stage.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, StyleAssessment};

const SYSTEM_PROMPT: &str = r#"You are a style editor for a publication read by senior engineers and researchers. Evaluate the article's writing and output strict JSON with exactly:

- "technical_depth_level": e.g. "Deeply Technical", "Moderately Technical", "Surface-Level".
- "language_sophistication": e.g. "High (Precise & Nuanced)", "Adequate", "Basic (Lacks Nuance)".
- "tone_suitability_for_experts": e.g. "Highly Suitable", "Suitable", "Not Suitable (Too basic/promotional)".
- "clarity_of_explanation_score": 0.0-1.0.
- "jargon_usage_evaluation": e.g. "Well-Explained", "Assumed", "Overused".
- "key_observations_on_style": 1-2 sentences.
- "overall_stylistic_recommendation": one of "Publish As Is (Style)", "Minor Edits for Clarity/Tone", "Substantial Rewrite Recommended", "Reject (Style Unsuitable)".

Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "technical_depth_level",
    "language_sophistication",
    "tone_suitability_for_experts",
    "clarity_of_explanation_score",
    "jargon_usage_evaluation",
    "key_observations_on_style",
    "overall_stylistic_recommendation",
];

/// The sophistication stylist.
pub struct StylistStage;

#[async_trait]
impl Stage for StylistStage {
    fn name(&self) -> &'static str {
        "sophistication_stylist"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let body = record.raw_scraped_text.clone().unwrap_or_default();
        if body.trim().is_empty() {
            return Err(StageError::InsufficientInput("no body text".to_string()));
        }

        let payload = payload_json(&json!({
            "title": record.initial_title,
            "body_excerpt": body.chars().take(4000).collect::<String>(),
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::Analytical, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        record.style_assessment = Some(
            serde_json::from_value(value)
                .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?,
        );
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.style_assessment = Some(StyleAssessment {
            technical_depth_level: "Uncertain".to_string(),
            language_sophistication: "Uncertain".to_string(),
            tone_suitability_for_experts: "Uncertain".to_string(),
            clarity_of_explanation_score: 0.0,
            jargon_usage_evaluation: "Uncertain".to_string(),
            key_observations_on_style: "Upstream style assessment missing.".to_string(),
            overall_stylistic_recommendation: "Minor Edits for Clarity/Tone".to_string(),
        });
    }
}
