//! Corroboration stage: checks how widely the core event is reported
//! by external outlets.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, CorroborationAssessment};
use crate::search::{domain_of, MAX_SEARCH_RESULTS};

const SYSTEM_PROMPT: &str = r#"You are a fact-verification and source-analysis specialist. You receive a core subject/event, key entities, the original article's source domain, and a list of news search results. Output strict JSON with exactly:

- "corroboration_level": one of "Strongly Corroborated", "Moderately Corroborated", "Weakly Corroborated", "Isolated Claim/Uncorroborated", "Unable to Determine".
- "corroboration_confidence_score": 0.0-1.0.
- "supporting_source_domains_tier1": array of tier-1 domains (global outlets: Reuters, AP, Bloomberg, BBC; top tech press: TechCrunch, The Verge, Wired, Ars Technica).
- "supporting_source_domains_tier2": array of reputable niche/trade domains.
- "conflicting_information_flag": true when sources contradict key facts.
- "corroboration_summary_notes": concise reasoning naming the key domains.

Rules: a result only counts when its title/snippet covers the same core event and names at least one key entity. The article's own source domain MUST be excluded from all corroboration counts. "Strongly Corroborated" needs three distinct tier-1 domains; "Moderately" needs two across tiers or three tier-2; one or two tier-2 only is "Weakly"; none is "Isolated Claim/Uncorroborated". Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "corroboration_level",
    "corroboration_confidence_score",
    "supporting_source_domains_tier1",
    "supporting_source_domains_tier2",
    "conflicting_information_flag",
    "corroboration_summary_notes",
];

/// The corroboration analyzer.
pub struct CorroborationStage;

#[async_trait]
impl Stage for CorroborationStage {
    fn name(&self) -> &'static str {
        "corroboration_cognito"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let (subject, entities) = match record.editorial_prime_assessment.as_ref() {
            Some(a) if !a.core_subject_event.is_empty() && a.core_subject_event != "N/A" => {
                (a.core_subject_event.clone(), a.preliminary_key_entities.clone())
            }
            _ => {
                return Err(StageError::InsufficientInput(
                    "no core subject event from triage".to_string(),
                ))
            }
        };

        let source_domain = record
            .original_source_url
            .as_deref()
            .and_then(domain_of)
            .unwrap_or_default();

        let mut results = ctx.search.search_news(&subject, &entities).await;
        results.truncate(MAX_SEARCH_RESULTS);

        let payload = payload_json(&json!({
            "core_subject_event": subject,
            "preliminary_key_entities": entities,
            "article_source_domain": source_domain,
            "news_search_results": results,
        }));

        let value = ctx
            .gateway
            .call(
                ModelProfile::DeterministicJson,
                SYSTEM_PROMPT,
                &payload,
                EXPECT_KEYS,
            )
            .await?;

        let mut assessment: CorroborationAssessment = serde_json::from_value(value)
            .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?;

        // Belt-and-suspenders on the exclusion rule: the model is told to
        // drop the article's own domain, but the invariant is enforced here.
        if !source_domain.is_empty() {
            assessment
                .supporting_source_domains_tier1
                .retain(|d| d != &source_domain);
            assessment
                .supporting_source_domains_tier2
                .retain(|d| d != &source_domain);
        }

        record.corroboration_assessment = Some(assessment);
        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.corroboration_assessment = Some(CorroborationAssessment {
            corroboration_level: "Unable to Determine".to_string(),
            corroboration_confidence_score: 0.0,
            corroboration_summary_notes:
                "Corroboration LLM call failed or input was insufficient.".to_string(),
            ..Default::default()
        });
    }
}
