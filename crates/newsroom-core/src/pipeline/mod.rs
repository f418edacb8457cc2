//! The pipeline orchestrator: drives one record through the ordered
//! stage sequence with early-exit gates, checkpointing after every
//! stage.
//!
//! Stage order: dedup, editorial triage, the analyzer chain, the
//! adjudicator, then the writing/publishing stages. Three gates can
//! short-circuit the traversal: a hard duplicate, a Boring triage with
//! no critical override, and an adjudicator verdict other than publish.

pub mod ingest;
pub mod worker;

use std::sync::Arc;

use crate::assemble;
use crate::config::Config;
use crate::error::StorageError;
use crate::publish::{jsonld, Publisher};
use crate::record::{ArticleRecord, TerminalStatus};
use crate::record::store::RecordStore;
use crate::social::SocialClient;
use crate::stages::{
    adjudicator::AdjudicatorStage, corroboration::CorroborationStage, dedup::DedupStage,
    description::DescriptionStage, editorial_prime, editorial_prime::EditorialPrimeStage,
    hype_detector::HypeDetectorStage, impact_scope::ImpactScopeStage,
    keyword_intelligence::KeywordIntelligenceStage, novelty::NoveltyStage, outline::OutlineStage,
    stylist::StylistStage, title::TitleStage, Stage, StageContext, StageRunner,
};
use crate::tts::TtsTaskManager;

/// Outcome of one record's traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The record ID.
    pub id: String,
    /// Terminal status reached.
    pub terminal: TerminalStatus,
}

/// The orchestrator.
pub struct Pipeline {
    records: RecordStore,
    runner: StageRunner,
    ctx: StageContext,
    publisher: Publisher,
    tts: Option<Arc<TtsTaskManager>>,
    social: Option<Arc<dyn SocialClient>>,
    config: Arc<Config>,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        records: RecordStore,
        ctx: StageContext,
        publisher: Publisher,
        tts: Option<Arc<TtsTaskManager>>,
        social: Option<Arc<dyn SocialClient>>,
        config: Arc<Config>,
    ) -> Self {
        let runner = StageRunner::new(std::time::Duration::from_secs(
            config.pipeline.stage_timeout_secs,
        ));
        Self {
            records,
            runner,
            ctx,
            publisher,
            tts,
            social,
            config,
        }
    }

    /// The record store backing this pipeline.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Drive one record through the full stage sequence.
    ///
    /// The record is loaded, mutated stage by stage, and saved after
    /// every stage so a crash resumes from the last checkpoint.
    pub async fn process_record(&self, id: &str) -> Result<RecordOutcome, StorageError> {
        let mut record = self.records.load(id)?;
        tracing::info!(id, title = %record.display_title(), "pipeline traversal start");

        // -- Gate 1: dedup --
        self.run_and_save(&DedupStage, &mut record).await?;
        if record.is_duplicate {
            return self.finish(record, TerminalStatus::TerminalDuplicate).await;
        }

        // -- Gate 2: editorial triage --
        self.run_and_save(&EditorialPrimeStage, &mut record).await?;
        if editorial_prime::is_boring_without_override(&record) {
            return self
                .finish(record, TerminalStatus::TerminalRejectedBoring)
                .await;
        }

        // -- Analyzer chain --
        self.run_and_save(&NoveltyStage, &mut record).await?;
        self.run_and_save(&ImpactScopeStage, &mut record).await?;
        self.run_and_save(&HypeDetectorStage, &mut record).await?;
        self.run_and_save(&StylistStage, &mut record).await?;
        self.run_and_save(&CorroborationStage, &mut record).await?;

        // -- Gate 3: adjudication --
        self.run_and_save(&AdjudicatorStage, &mut record).await?;
        let decision = record
            .final_adjudication
            .as_ref()
            .map(|v| v.final_publication_decision.clone())
            .unwrap_or_default();
        if decision.starts_with("Reject") {
            return self
                .finish(record, TerminalStatus::TerminalRejectedAdjudicator)
                .await;
        }
        if decision.starts_with("Flag") {
            // Retained for a human editor; never auto-published.
            return self
                .finish(record, TerminalStatus::TerminalFlaggedForReview)
                .await;
        }

        // -- Writing chain --
        self.run_and_save(&KeywordIntelligenceStage, &mut record).await?;
        self.run_and_save(&TitleStage, &mut record).await?;
        self.run_and_save(&DescriptionStage, &mut record).await?;
        self.run_and_save(&OutlineStage, &mut record).await?;

        let assembler_status = assemble::assemble_article(&mut record);
        record.set_status("content_assembler", assembler_status);
        self.records.save(&record)?;

        let body = record.assembled_article_body_md.clone().unwrap_or_default();
        let report = assemble::media::integrate_media(
            &body,
            &record.media_candidates_for_body,
            self.config.site.image_caption_style,
        );
        record.generated_article_body_md_final = Some(report.body);
        record.set_status("image_integration", report.status);
        self.records.save(&record)?;

        record.generated_json_ld_object = Some(jsonld::generate_news_article_json_ld(
            &record,
            &self.config.site,
        ));
        record.set_status("json_ld", "SUCCESS");
        self.records.save(&record)?;

        // -- Optional audio --
        if let Some(tts) = &self.tts {
            self.run_tts(tts, &mut record).await;
            self.records.save(&record)?;
        }

        // -- Publish --
        match self.publisher.publish(&mut record) {
            Ok(slug) => {
                record.set_status("publish", "SUCCESS");
                tracing::info!(id, slug = %slug, "article published");
            }
            Err(e) => {
                tracing::error!(id, error = %e, "publish failed");
                record.set_status("publish", "FAILED_WRITE");
                self.records.save(&record)?;
                return Err(e);
            }
        }
        self.records.save(&record)?;

        // -- Optional social distribution --
        if let Some(social) = &self.social {
            self.run_social(social.as_ref(), &mut record).await;
            self.records.save(&record)?;
        }

        self.finish(record, TerminalStatus::TerminalPublished).await
    }

    async fn run_and_save(
        &self,
        stage: &dyn Stage,
        record: &mut ArticleRecord,
    ) -> Result<(), StorageError> {
        self.runner.execute(stage, record, &self.ctx).await;
        self.records.save(record)
    }

    async fn finish(
        &self,
        mut record: ArticleRecord,
        terminal: TerminalStatus,
    ) -> Result<RecordOutcome, StorageError> {
        record.terminal_status = Some(terminal);
        self.records.save(&record)?;
        tracing::info!(id = %record.id, ?terminal, "pipeline traversal done");
        Ok(RecordOutcome {
            id: record.id,
            terminal,
        })
    }

    async fn run_tts(&self, tts: &TtsTaskManager, record: &mut ArticleRecord) {
        if TtsTaskManager::should_skip(record) {
            tracing::info!(id = %record.id, "TTS skipped (done or non-recoverable)");
            record.set_status("tts", "SKIPPED");
            return;
        }
        let text = record
            .generated_article_body_md_final
            .clone()
            .or_else(|| record.assembled_article_body_md.clone())
            .unwrap_or_default();
        match tts.synthesize(record, &text).await {
            Ok(()) => record.set_status("tts", "SUCCESS"),
            Err(e) => {
                // Audio is best-effort; publication proceeds without it.
                tracing::error!(id = %record.id, error = %e, "TTS failed");
                record.set_status("tts", "FAILED_WITH_FALLBACK");
            }
        }
    }

    async fn run_social(&self, social: &dyn SocialClient, record: &mut ArticleRecord) {
        let url = self
            .publisher
            .canonical_url(record.slug.as_deref().unwrap_or_default());
        match social
            .post_article(
                record.display_title(),
                &url,
                record.selected_image_url.as_deref(),
            )
            .await
        {
            Ok(outcome) if outcome.duplicate => {
                record.set_status("social_post", "SKIPPED_DUPLICATE_CONTENT");
            }
            Ok(_) => record.set_status("social_post", "SUCCESS"),
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "social post failed");
                record.set_status("social_post", "FAILED_WITH_FALLBACK");
            }
        }
    }
}
