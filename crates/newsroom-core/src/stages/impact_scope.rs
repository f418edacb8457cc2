//! Impact-scope assessment stage.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, ImpactScopeAssessment};

const SYSTEM_PROMPT: &str = r#"You are a market and technology impact analyst. Given the article context, output strict JSON with exactly:

- "estimated_impact_scale": one of "Global & Cross-Industry", "Multiple Key Industries", "Specific Tech Sector", "Niche Application", "Localized/Limited", "Uncertain/Too Early".
- "primary_affected_sectors": array of sector names.
- "secondary_affected_sectors_or_domains": array of second-order sectors or domains.
- "target_audience_relevance": object mapping each of "researchers_academics", "technical_leads_architects", "software_developers", "c_suite_executives", "investors_financial_analysts", "product_managers", "general_tech_enthusiasts" to a 0.0-1.0 relevance.
- "timeframe_for_significant_impact": one of "Immediate", "Short-term", "Medium-term", "Long-term", "Speculative".
- "impact_magnitude_qualifier": one of "Transformative", "Substantial", "Moderate", "Minor", "Negligible".
- "impact_confidence_score": 0.0-1.0.
- "impact_rationale_summary": one short paragraph.

Ground every judgement in what the article actually establishes, not what it promises. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "estimated_impact_scale",
    "primary_affected_sectors",
    "secondary_affected_sectors_or_domains",
    "target_audience_relevance",
    "timeframe_for_significant_impact",
    "impact_magnitude_qualifier",
    "impact_confidence_score",
    "impact_rationale_summary",
];

/// The impact-scope analyzer.
pub struct ImpactScopeStage;

#[async_trait]
impl Stage for ImpactScopeStage {
    fn name(&self) -> &'static str {
        "impact_scope"
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

        let payload = payload_json(&json!({
            "title": record.initial_title,
            "summary": summary,
            "core_subject_event": record
                .editorial_prime_assessment
                .as_ref()
                .map(|a| a.core_subject_event.clone()),
            "novelty_level": record
                .novelty_assessment
                .as_ref()
                .map(|a| a.novelty_level.clone()),
            "body_excerpt": record
                .raw_scraped_text
                .as_deref()
                .map(|t| t.chars().take(2500).collect::<String>()),
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::Analytical, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        record.impact_scope_assessment = Some(
            serde_json::from_value(value)
                .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?,
        );
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.impact_scope_assessment = Some(ImpactScopeAssessment {
            estimated_impact_scale: "Uncertain/Too Early".to_string(),
            impact_magnitude_qualifier: "Negligible".to_string(),
            timeframe_for_significant_impact: "Speculative".to_string(),
            impact_confidence_score: 0.0,
            impact_rationale_summary: "Upstream impact assessment missing.".to_string(),
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
    async fn success_parses_audience_map() {
        let reply = serde_json::json!({
            "estimated_impact_scale": "Global & Cross-Industry",
            "primary_affected_sectors": ["AI Research", "Cloud Computing"],
            "secondary_affected_sectors_or_domains": ["Finance"],
            "target_audience_relevance": {"researchers_academics": 1.0, "c_suite_executives": 0.8},
            "timeframe_for_significant_impact": "Medium-term",
            "impact_magnitude_qualifier": "Transformative",
            "impact_confidence_score": 0.9,
            "impact_rationale_summary": "Sector-redefining performance jump."
        })
        .to_string();
        let (_guard, ctx) = test_context(&reply);
        let mut record = ArticleRecord::new("i1");
        record.processed_summary = Some("Summary.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&ImpactScopeStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("impact_scope"), Some(status::SUCCESS));
        let a = record.impact_scope_assessment.as_ref().unwrap();
        assert_eq!(a.estimated_impact_scale, "Global & Cross-Industry");
        assert_eq!(a.target_audience_relevance["researchers_academics"], 1.0);
    }

    #[tokio::test]
    async fn fallback_is_conservative() {
        let (_guard, ctx) = test_context("not json at all");
        let mut record = ArticleRecord::new("i2");
        record.processed_summary = Some("Summary.".to_string());

        StageRunner::new(Duration::from_secs(5))
            .execute(&ImpactScopeStage, &mut record, &ctx)
            .await;

        assert_eq!(record.status("impact_scope"), Some(status::FAILED_LLM_CALL));
        let a = record.impact_scope_assessment.as_ref().unwrap();
        assert_eq!(a.estimated_impact_scale, "Uncertain/Too Early");
        assert_eq!(a.impact_magnitude_qualifier, "Negligible");
    }
}
