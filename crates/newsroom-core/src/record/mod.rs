//! The article record: the single authoritative entity carried through
//! the pipeline.
//!
//! A record is created once at ingest and mutated only by stage handlers,
//! each of which writes exactly one assessment block and one status key.
//! Unknown keys survive a load/save cycle through the `extra` map, so
//! experimental fields added by one deployment are not destroyed by
//! another.

pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Preliminary editorial triage produced by the first analysis stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EditorialPrimeAssessment {
    /// One-line statement of the core subject or event.
    #[serde(default)]
    pub core_subject_event: String,

    /// First-pass summary of the article.
    #[serde(default)]
    pub first_pass_summary: String,

    /// Named entities spotted during triage.
    #[serde(default)]
    pub preliminary_key_entities: Vec<String>,

    /// Importance bucket: "Breaking", "Important", "Interesting", "Boring".
    #[serde(default)]
    pub preliminary_importance_level: String,

    /// How relevant the piece is to the site's tech beat, 0.0-1.0.
    #[serde(default)]
    pub tech_relevance_score: f32,

    /// Whether a critical entity (major vendor, severe CVE) overrides a
    /// Boring verdict.
    #[serde(default)]
    pub critical_override_triggered: bool,

    /// Which entity triggered the override and why.
    #[serde(default)]
    pub critical_override_entity_reason: String,

    /// Early novelty/impact statement for downstream stages.
    #[serde(default)]
    pub preliminary_novelty_impact_statement: String,

    /// Free-form triage notes.
    #[serde(default)]
    pub editorial_prime_notes: String,
}

/// Novelty assessment block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NoveltyAssessment {
    /// "Revolutionary", "Significant", "Incremental", or "None".
    #[serde(default)]
    pub novelty_level: String,

    /// Confidence in the novelty call, 0.0-1.0.
    #[serde(default)]
    pub novelty_confidence: f32,

    /// Concrete evidence supporting a breakthrough claim.
    #[serde(default)]
    pub breakthrough_evidence: Vec<String>,
}

/// Impact-scope assessment block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImpactScopeAssessment {
    /// "Global & Cross-Industry" down to "Uncertain/Too Early".
    #[serde(default)]
    pub estimated_impact_scale: String,

    /// Sectors hit directly.
    #[serde(default)]
    pub primary_affected_sectors: Vec<String>,

    /// Sectors or domains hit second-order.
    #[serde(default)]
    pub secondary_affected_sectors_or_domains: Vec<String>,

    /// Relevance per named audience, 0.0-1.0 each.
    #[serde(default)]
    pub target_audience_relevance: BTreeMap<String, f32>,

    /// "Immediate", "Short-term", "Medium-term", "Long-term", "Speculative".
    #[serde(default)]
    pub timeframe_for_significant_impact: String,

    /// "Transformative", "Substantial", "Moderate", "Minor", "Negligible".
    #[serde(default)]
    pub impact_magnitude_qualifier: String,

    /// Confidence in the impact call, 0.0-1.0.
    #[serde(default)]
    pub impact_confidence_score: f32,

    /// One-paragraph rationale.
    #[serde(default)]
    pub impact_rationale_summary: String,
}

/// Hype-detection assessment block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HypeAssessment {
    /// 0.0 (sober) to 1.0 (pure hype).
    #[serde(default)]
    pub hype_score: f32,

    /// "Well-Substantiated" down to "Highly Unsubstantiated".
    #[serde(default)]
    pub substantiation_level: String,

    /// Phrases or claims flagged as hype.
    #[serde(default)]
    pub identified_hype_phrases_or_claims: Vec<String>,

    /// Summary of missing evidence.
    #[serde(default)]
    pub evidence_gaps_summary: String,

    /// Overall tone evaluation.
    #[serde(default)]
    pub overall_content_tone_evaluation: String,

    /// "Proceed As Is", "Proceed with Caution (verify claims)", or
    /// "Reject (Primarily Hype/PR)".
    #[serde(default)]
    pub recommendation_for_publication: String,
}

/// Style/sophistication assessment block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StyleAssessment {
    /// Depth of the technical treatment.
    #[serde(default)]
    pub technical_depth_level: String,

    /// Sophistication of the prose.
    #[serde(default)]
    pub language_sophistication: String,

    /// Whether the tone suits an expert readership.
    #[serde(default)]
    pub tone_suitability_for_experts: String,

    /// Clarity of explanation, 0.0-1.0.
    #[serde(default)]
    pub clarity_of_explanation_score: f32,

    /// How jargon is handled.
    #[serde(default)]
    pub jargon_usage_evaluation: String,

    /// Free-form stylist observations.
    #[serde(default)]
    pub key_observations_on_style: String,

    /// "Publish As Is (Style)", "Minor Edits for Clarity/Tone",
    /// "Substantial Rewrite Recommended", or "Reject (Style Unsuitable)".
    #[serde(default)]
    pub overall_stylistic_recommendation: String,
}

/// Corroboration assessment block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorroborationAssessment {
    /// "Strongly Corroborated" down to "Unable to Determine".
    #[serde(default)]
    pub corroboration_level: String,

    /// Confidence in the corroboration call, 0.0-1.0.
    #[serde(default)]
    pub corroboration_confidence_score: f32,

    /// Tier-1 (major outlet) domains reporting the same story.
    #[serde(default)]
    pub supporting_source_domains_tier1: Vec<String>,

    /// Tier-2 (trade press, vendor blog) supporting domains.
    #[serde(default)]
    pub supporting_source_domains_tier2: Vec<String>,

    /// Whether any source contradicts the article's claims.
    #[serde(default)]
    pub conflicting_information_flag: bool,

    /// Free-form corroboration notes.
    #[serde(default)]
    pub corroboration_summary_notes: String,
}

/// The adjudicator's synthesized verdict.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FinalAdjudication {
    /// "Publish Immediately", "Publish with Minor Edits (Automated)",
    /// "Flag for Human Review (Specific Concerns)", or
    /// "Reject (Clear Reasons)".
    #[serde(default)]
    pub final_publication_decision: String,

    /// Overall value/excitement score, 0-100.
    #[serde(default)]
    pub overall_value_excitement_score: u32,

    /// Rationale citing the upstream findings.
    #[serde(default)]
    pub decision_rationale_summary: String,

    /// Up to three strengths.
    #[serde(default)]
    pub key_strengths: Vec<String>,

    /// Up to three weaknesses or concerns.
    #[serde(default)]
    pub key_weaknesses_or_concerns: Vec<String>,

    /// Suggested follow-ups when not publishing immediately.
    #[serde(default)]
    pub suggested_next_steps_for_human_editor: Vec<String>,
}

impl FinalAdjudication {
    /// Whether this verdict rejects the article outright.
    pub fn is_reject(&self) -> bool {
        self.final_publication_decision.starts_with("Reject")
    }
}

/// One planned section of the article outline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutlineSection {
    /// "introduction", "body_section", or "conclusion".
    #[serde(rename = "type", default)]
    pub section_type: String,

    /// Markdown heading the writer should open with (e.g. `## Why It Matters`).
    #[serde(default)]
    pub heading_suggestion: String,

    /// Planner guidance handed to the section writer.
    #[serde(default)]
    pub writing_instructions: String,

    /// The drafted markdown, once the writer has run.
    #[serde(default)]
    pub generated_markdown: Option<String>,

    /// Writer outcome for this section.
    #[serde(default)]
    pub writer_status: Option<String>,
}

/// Ordered outline of the article to be written.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArticleOutline {
    /// The planner's H1 suggestion.
    #[serde(default)]
    pub article_h1_suggestion: String,

    /// Planner strategy notes.
    #[serde(default)]
    pub outline_strategy_notes: String,

    /// Ordered section descriptors.
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
}

/// A candidate image for one body placeholder.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MediaCandidate {
    /// The placeholder description this candidate was selected for.
    #[serde(default)]
    pub description: String,

    /// The image URL to embed.
    #[serde(default)]
    pub image_url: String,

    /// Alt text for the image tag.
    #[serde(default)]
    pub alt_text: String,

    /// Vision-model caption, if one was produced.
    #[serde(default)]
    pub vlm_caption: Option<String>,
}

/// One near-duplicate hit from the duplicate store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NearDuplicate {
    /// The prior article's ID.
    pub id: String,
    /// Cosine similarity to that article.
    pub score: f32,
}

/// TTS task progression recorded on the article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TtsTaskState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Task submitted, `task_id` captured.
    Created,
    /// Waiting on the service.
    Polling,
    /// Task succeeded; fetching the result URL.
    Fetching,
    /// Streaming audio bytes to disk.
    Downloading,
    /// Audio saved; `audio_url` points at the relative web path.
    Done,
    /// The service reported failure.
    Failed,
    /// Polling exhausted its attempt budget.
    TimedOut,
}

/// Terminal pipeline outcome for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    /// Hard duplicate of a stored article; not published, not stored.
    TerminalDuplicate,
    /// Triaged Boring with no critical override.
    TerminalRejectedBoring,
    /// Adjudicator rejected the piece.
    TerminalRejectedAdjudicator,
    /// Published to the static corpus.
    TerminalPublished,
    /// Adjudicator flagged the piece for a human editor.
    TerminalFlaggedForReview,
}

/// The single authoritative article entity.
///
/// Field groups mirror the pipeline's stage order: ingest identity, dedup
/// verdict, assessment blocks, writing artifacts, publication metadata.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Opaque stable identifier, slug-safe, assigned at ingest.
    pub id: String,

    // -- Ingest identity --
    /// Where the article was scraped or submitted from.
    #[serde(default)]
    pub original_source_url: Option<String>,

    /// Title as first seen.
    #[serde(default)]
    pub initial_title: Option<String>,

    /// Raw scraped body text.
    #[serde(default)]
    pub raw_scraped_text: Option<String>,

    /// When the candidate was retrieved.
    #[serde(default)]
    pub retrieved_at_utc: Option<DateTime<Utc>>,

    /// Publication timestamp as reported by the source (unvalidated).
    #[serde(default)]
    pub published_iso_utc: Option<String>,

    /// Source-provided summary.
    #[serde(default)]
    pub summary: Option<String>,

    /// Cleaned/condensed summary used by downstream stages.
    #[serde(default)]
    pub processed_summary: Option<String>,

    // -- Topic and keywords --
    /// Primary topic assigned at ingest or by triage.
    #[serde(default)]
    pub primary_topic: Option<String>,

    /// Ingest-time keyword candidates.
    #[serde(default)]
    pub candidate_keywords: Vec<String>,

    /// Final ordered keywords; index 0 is the canonical primary.
    #[serde(default)]
    pub final_keywords: Vec<String>,

    // -- Dedup verdict --
    /// Hard-duplicate flag; a duplicate is never added to the store.
    #[serde(default)]
    pub is_duplicate: bool,

    /// ID of the most similar stored article.
    #[serde(default)]
    pub highest_similar_article_id: Option<String>,

    /// Similarity to the most similar stored article.
    #[serde(default)]
    pub similarity_score_to_highest: f32,

    /// Top near-duplicates (at most three, by score).
    #[serde(default)]
    pub near_duplicates_found: Vec<NearDuplicate>,

    // -- Assessment blocks --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_prime_assessment: Option<EditorialPrimeAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novelty_assessment: Option<NoveltyAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_scope_assessment: Option<ImpactScopeAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hype_assessment: Option<HypeAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_assessment: Option<StyleAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corroboration_assessment: Option<CorroborationAssessment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_adjudication: Option<FinalAdjudication>,

    // -- Writing artifacts --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_outline: Option<ArticleOutline>,

    /// Assembled markdown body before media integration.
    #[serde(default)]
    pub assembled_article_body_md: Option<String>,

    /// Final markdown body after media integration.
    #[serde(default)]
    pub generated_article_body_md_final: Option<String>,

    // -- Publication metadata --
    /// URL-safe slug derived from the H1.
    #[serde(default)]
    pub slug: Option<String>,

    /// The page H1; set exactly once by the title stage.
    #[serde(default)]
    pub final_page_h1: Option<String>,

    /// SEO title tag.
    #[serde(default)]
    pub generated_title_tag: Option<String>,

    /// SEO H1 candidate produced by the title stage.
    #[serde(default)]
    pub generated_seo_h1: Option<String>,

    /// Meta description.
    #[serde(default)]
    pub generated_meta_description: Option<String>,

    /// Synthesized JSON-LD `NewsArticle` object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_json_ld_object: Option<serde_json::Value>,

    // -- Media --
    /// Featured image URL.
    #[serde(default)]
    pub selected_image_url: Option<String>,

    /// Candidate images for body placeholders.
    #[serde(default)]
    pub media_candidates_for_body: Vec<MediaCandidate>,

    // -- Audio --
    /// Relative web path of the synthesized audio (`audio/{id}.wav`).
    #[serde(default)]
    pub audio_url: Option<String>,

    /// TTS task progression.
    #[serde(default)]
    pub tts_task_state: TtsTaskState,

    /// Last TTS failure reason, used to decide retry eligibility.
    #[serde(default)]
    pub tts_error: Option<String>,

    // -- Manual ingest hints --
    /// Importance assigned by the manual pick tool.
    #[serde(default)]
    pub manual_priority_importance: Option<String>,

    /// Trending flag assigned by the manual pick tool.
    #[serde(default)]
    pub manual_is_trending: bool,

    // -- Pipeline bookkeeping --
    /// Per-stage status keys; values may carry detail
    /// (e.g. `DUPLICATE_OF_{id}`).
    #[serde(default)]
    pub stage_statuses: BTreeMap<String, String>,

    /// Terminal pipeline outcome, once reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_status: Option<TerminalStatus>,

    /// Free-form extension fields preserved across load/save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ArticleRecord {
    /// Create a fresh record at ingest time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            retrieved_at_utc: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Record a stage status. Values overwrite only their own key;
    /// earlier-stage statuses are never touched.
    pub fn set_status(&mut self, stage: &str, status: impl Into<String>) {
        self.stage_statuses.insert(stage.to_string(), status.into());
    }

    /// Look up a stage status.
    pub fn status(&self, stage: &str) -> Option<&str> {
        self.stage_statuses.get(stage).map(String::as_str)
    }

    /// The canonical primary keyword: `final_keywords[0]`, falling back
    /// to `primary_topic`, then `initial_title`.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.final_keywords
            .first()
            .map(String::as_str)
            .or(self.primary_topic.as_deref())
            .or(self.initial_title.as_deref())
    }

    /// Best available title for logs and fallbacks.
    pub fn display_title(&self) -> &str {
        self.final_page_h1
            .as_deref()
            .or(self.initial_title.as_deref())
            .unwrap_or("(untitled)")
    }
}
