//! Editorial triage: the first LLM stage, producing the preliminary
//! importance verdict that gates the rest of the analysis chain.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, EditorialPrimeAssessment};

const SYSTEM_PROMPT: &str = r#"You are EditorialPrime, the chief triage editor of a technology news desk. Given a candidate article (title, summary, body excerpt), produce a strict JSON object with exactly these keys:

- "core_subject_event": one sentence naming the core subject or event.
- "first_pass_summary": a 2-3 sentence neutral summary.
- "preliminary_key_entities": array of organizations, products, and people named.
- "preliminary_importance_level": one of "Breaking", "Important", "Interesting", "Boring".
- "tech_relevance_score": 0.0-1.0, how squarely this sits on a technology beat.
- "critical_override_triggered": true when a major vendor event or severe security issue justifies coverage regardless of the importance level.
- "critical_override_entity_reason": which entity triggered the override and why, or "".
- "preliminary_novelty_impact_statement": one sentence on what, if anything, is new here.
- "editorial_prime_notes": anything the downstream specialists should verify.

Judge importance as a seasoned editor: vendor press releases without substance are Boring; real capability jumps, major incidents, and industry-moving launches are Important or Breaking. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "core_subject_event",
    "first_pass_summary",
    "preliminary_key_entities",
    "preliminary_importance_level",
    "tech_relevance_score",
    "critical_override_triggered",
];

const MAX_BODY_EXCERPT: usize = 3000;

/// The editorial triage stage.
pub struct EditorialPrimeStage;

#[async_trait]
impl Stage for EditorialPrimeStage {
    fn name(&self) -> &'static str {
        "editorial_prime"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let title = record.initial_title.clone().unwrap_or_default();
        let summary = record
            .summary
            .clone()
            .or_else(|| record.processed_summary.clone())
            .unwrap_or_default();
        let body = record.raw_scraped_text.clone().unwrap_or_default();

        if title.is_empty() && summary.is_empty() && body.is_empty() {
            return Err(StageError::InsufficientInput(
                "no title, summary, or body text".to_string(),
            ));
        }

        let excerpt: String = body.chars().take(MAX_BODY_EXCERPT).collect();
        let payload = payload_json(&json!({
            "article_id": record.id,
            "title": title,
            "summary": summary,
            "body_excerpt": excerpt,
        }));

        let value = ctx
            .gateway
            .call(ModelProfile::Analytical, SYSTEM_PROMPT, &payload, EXPECT_KEYS)
            .await?;

        let assessment: EditorialPrimeAssessment = serde_json::from_value(value)
            .map_err(|e| StageError::Other(format!("assessment did not deserialize: {e}")))?;

        // Triage also seeds the processed summary used by later stages.
        if record.processed_summary.is_none() && !assessment.first_pass_summary.is_empty() {
            record.processed_summary = Some(assessment.first_pass_summary.clone());
        }
        record.editorial_prime_assessment = Some(assessment);

        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        // Conservative default: not Boring, so a transient LLM failure
        // does not discard a possibly important story.
        record.editorial_prime_assessment = Some(EditorialPrimeAssessment {
            core_subject_event: "N/A".to_string(),
            preliminary_importance_level: "Interesting".to_string(),
            tech_relevance_score: 0.5,
            editorial_prime_notes: "Triage LLM call failed; defaults applied.".to_string(),
            ..Default::default()
        });
    }
}

/// Gate predicate: a Boring verdict with no critical override rejects
/// the record before the expensive analysis chain runs.
pub fn is_boring_without_override(record: &ArticleRecord) -> bool {
    record
        .editorial_prime_assessment
        .as_ref()
        .is_some_and(|a| {
            a.preliminary_importance_level == "Boring" && !a.critical_override_triggered
        })
}
