//! The adjudicator: synthesizes every upstream assessment into a single
//! publish/reject verdict.
//!
//! The LLM produces the value/excitement score and the rationale; the
//! decision itself is bound deterministically to the score and the
//! upstream flags, so the same inputs always yield the same verdict even
//! when the model phrases its own decision differently.

use async_trait::async_trait;
use serde_json::json;

use super::{payload_json, Stage, StageContext, StageError};
use crate::llm::ModelProfile;
use crate::record::{ArticleRecord, FinalAdjudication};

const SYSTEM_PROMPT: &str = r#"You are the chief editor delivering the final publication verdict on a tech article by synthesizing the specialist assessments you receive. Output strict JSON with exactly:

- "final_publication_decision": one of "Publish Immediately", "Publish with Minor Edits (Automated)", "Flag for Human Review (Specific Concerns)", "Reject (Clear Reasons)".
- "overall_value_excitement_score": integer 0-100.
- "decision_rationale_summary": concise rationale citing the specialist findings.
- "key_strengths": up to three strings.
- "key_weaknesses_or_concerns": up to three strings.
- "suggested_next_steps_for_human_editor": strings (empty when publishing immediately).

Scoring guide: 85-100 for revolutionary, transformative, well-corroborated low-hype pieces; 70-84 for significant solid pieces needing at most minor tweaks; 50-69 for incremental or mixed-signal pieces; below 50 for no real novelty, negligible impact, poor corroboration, or heavy hype. Output only the JSON object."#;

const EXPECT_KEYS: &[&str] = &[
    "final_publication_decision",
    "overall_value_excitement_score",
    "decision_rationale_summary",
    "key_strengths",
    "key_weaknesses_or_concerns",
    "suggested_next_steps_for_human_editor",
];

const DECISION_PUBLISH: &str = "Publish Immediately";
const DECISION_MINOR_EDITS: &str = "Publish with Minor Edits (Automated)";
const DECISION_HUMAN_REVIEW: &str = "Flag for Human Review (Specific Concerns)";
const DECISION_REJECT: &str = "Reject (Clear Reasons)";

/// The adjudicator stage.
pub struct AdjudicatorStage;

#[async_trait]
impl Stage for AdjudicatorStage {
    fn name(&self) -> &'static str {
        "adjudicator_prime"
    }

    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError> {
        let payload = payload_json(&json!({
            "article_id": record.id,
            "article_title": record.display_title(),
            "editorial_prime_assessment": record.editorial_prime_assessment,
            "novelty_assessment": record.novelty_assessment,
            "impact_scope_assessment": record.impact_scope_assessment,
            "hype_assessment": record.hype_assessment,
            "style_assessment": record.style_assessment,
            "corroboration_assessment": record.corroboration_assessment,
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

        let mut verdict: FinalAdjudication = serde_json::from_value(value)
            .map_err(|e| StageError::Other(format!("verdict did not deserialize: {e}")))?;

        apply_decision_bindings(&mut verdict, record);
        record.final_adjudication = Some(verdict);

        Ok(super::status::SUCCESS.to_string())
    }

    fn apply_fallback(&self, record: &mut ArticleRecord) {
        record.final_adjudication = Some(FinalAdjudication {
            final_publication_decision: DECISION_HUMAN_REVIEW.to_string(),
            overall_value_excitement_score: 30,
            decision_rationale_summary:
                "Adjudicator LLM call failed or returned invalid data. Manual review required."
                    .to_string(),
            key_strengths: Vec::new(),
            key_weaknesses_or_concerns: vec!["Adjudicator LLM failure".to_string()],
            suggested_next_steps_for_human_editor: vec![
                "Full manual review of all agent outputs and article content needed.".to_string(),
            ],
        });
    }
}

/// Bind the decision to the score and the upstream flags.
///
/// - score >= 85, no caution flags, corroboration at least moderate:
///   Publish Immediately.
/// - 70-84 with no caution flags: Publish with Minor Edits.
/// - 50-69 or any mixed signal: Flag for Human Review.
/// - score < 50 or a critical failure (isolated claim, hype reject,
///   boring without override): Reject. A critical failure also caps the
///   score below 50 so score and decision cannot disagree.
fn apply_decision_bindings(verdict: &mut FinalAdjudication, record: &ArticleRecord) {
    let hype_rec = record
        .hype_assessment
        .as_ref()
        .map(|a| a.recommendation_for_publication.as_str())
        .unwrap_or_default();
    let style_rec = record
        .style_assessment
        .as_ref()
        .map(|a| a.overall_stylistic_recommendation.as_str())
        .unwrap_or_default();
    let corroboration = record
        .corroboration_assessment
        .as_ref()
        .map(|a| a.corroboration_level.as_str())
        .unwrap_or_default();
    let boring_no_override = record
        .editorial_prime_assessment
        .as_ref()
        .is_some_and(|a| {
            a.preliminary_importance_level == "Boring" && !a.critical_override_triggered
        });

    let critical_failure = corroboration.starts_with("Isolated")
        || hype_rec.starts_with("Reject")
        || style_rec.starts_with("Reject")
        || boring_no_override;

    let caution_flag = hype_rec.contains("Caution")
        || style_rec.contains("Substantial Rewrite")
        || corroboration.starts_with("Weakly");

    let corroboration_ok =
        corroboration.starts_with("Strongly") || corroboration.starts_with("Moderately");

    if critical_failure {
        verdict.overall_value_excitement_score = verdict.overall_value_excitement_score.min(49);
    }
    let score = verdict.overall_value_excitement_score;

    verdict.final_publication_decision = if score < 50 || critical_failure {
        DECISION_REJECT
    } else if score >= 85 && !caution_flag && corroboration_ok {
        DECISION_PUBLISH
    } else if (70..=84).contains(&score) && !caution_flag {
        DECISION_MINOR_EDITS
    } else {
        DECISION_HUMAN_REVIEW
    }
    .to_string();
}
