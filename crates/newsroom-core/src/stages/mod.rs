//! The stage contract and the stage runner.
//!
//! A stage is a named function that reads a declared subset of the record,
//! calls its collaborators, and writes exactly one assessment/result block.
//! The runner enforces the wall-clock timeout and the propagation policy:
//! no stage failure ever escapes past it. A failed stage always leaves a
//! defaulted assessment block behind so later stages and the publisher see
//! a complete record.

pub mod adjudicator;
pub mod corroboration;
pub mod dedup;
pub mod description;
pub mod editorial_prime;
pub mod hype_detector;
pub mod impact_scope;
pub mod keyword_intelligence;
pub mod novelty;
pub mod outline;
pub mod stylist;
pub mod title;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::dedup::DuplicateStore;
use crate::error::LlmError;
use crate::llm::gateway::LlmGateway;
use crate::record::ArticleRecord;
use crate::search::SearchProvider;

/// Canonical status strings shared by all stages.
pub mod status {
    pub const SUCCESS: &str = "SUCCESS";
    pub const FAILED_LLM_CALL: &str = "FAILED_LLM_CALL";
    pub const FAILED_WITH_FALLBACK: &str = "FAILED_WITH_FALLBACK";
    pub const FAILED_TIMEOUT: &str = "FAILED_TIMEOUT";
    pub const SKIPPED_INSUFFICIENT_INPUT: &str = "SKIPPED_INSUFFICIENT_INPUT";
}

/// Why a stage did not complete normally.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The LLM gateway failed after retries.
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    /// The record lacks the inputs this stage declares.
    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    /// Any other stage-internal failure.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    /// The status string recorded for this failure class.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Llm(_) => status::FAILED_LLM_CALL,
            Self::InsufficientInput(_) => status::SKIPPED_INSUFFICIENT_INPUT,
            Self::Other(_) => status::FAILED_WITH_FALLBACK,
        }
    }
}

/// Shared collaborators handed to every stage.
pub struct StageContext {
    /// The structured-JSON LLM gateway.
    pub gateway: Arc<LlmGateway>,
    /// The duplicate store.
    pub duplicates: Arc<DuplicateStore>,
    /// Search provider feeding corroboration.
    pub search: Arc<dyn SearchProvider>,
    /// Full configuration.
    pub config: Arc<Config>,
}

/// One named pipeline stage.
///
/// `run` returns the status string to record on success (most stages
/// return plain `SUCCESS`; dedup returns its detail string). On failure
/// the runner invokes `apply_fallback` so the record still carries a
/// complete, conservative assessment block.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name used for the status key and logging.
    fn name(&self) -> &'static str;

    /// Execute the stage against the record.
    async fn run(
        &self,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) -> Result<String, StageError>;

    /// Write the stage's defaulted block after a failure. The default
    /// implementation writes nothing; stages with an assessment contract
    /// override it.
    fn apply_fallback(&self, _record: &mut ArticleRecord) {}
}

/// Executes one stage with a wall-clock timeout and converts every
/// failure into a recorded status.
pub struct StageRunner {
    timeout: Duration,
}

impl StageRunner {
    /// Create a runner with the given per-stage timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `stage` against `record`, recording the outcome status.
    ///
    /// Never returns an error: timeouts and stage failures are folded
    /// into the record as `<stage>_status` plus the stage's fallback
    /// block.
    pub async fn execute(
        &self,
        stage: &dyn Stage,
        record: &mut ArticleRecord,
        ctx: &StageContext,
    ) {
        let name = stage.name();
        tracing::info!(stage = name, id = %record.id, "stage start");

        match tokio::time::timeout(self.timeout, stage.run(record, ctx)).await {
            Ok(Ok(stage_status)) => {
                tracing::info!(stage = name, id = %record.id, status = %stage_status, "stage done");
                record.set_status(name, stage_status);
            }
            Ok(Err(e)) => {
                tracing::error!(stage = name, id = %record.id, error = %e, "stage failed");
                stage.apply_fallback(record);
                record.set_status(name, e.status());
            }
            Err(_) => {
                tracing::error!(
                    stage = name,
                    id = %record.id,
                    timeout_secs = self.timeout.as_secs(),
                    "stage timed out",
                );
                stage.apply_fallback(record);
                record.set_status(name, status::FAILED_TIMEOUT);
            }
        }
    }
}

/// Serialize a subset of record fields into the user payload for an
/// analyzer call. Values are truncated at the caller's discretion before
/// reaching here.
pub(crate) fn payload_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for stage tests.

    use std::sync::Arc;
    use std::time::Duration;

    use super::StageContext;
    use crate::config::{Config, DedupConfig};
    use crate::dedup::DuplicateStore;
    use crate::embedding::Embedder;
    use crate::error::{EmbeddingError, LlmError};
    use crate::llm::gateway::{LlmGateway, RetryPolicy};
    use crate::llm::{GenerationParams, LlmProvider, LlmResponse};
    use crate::search::SimulatedSearchProvider;

    struct NullEmbedder;

    #[async_trait::async_trait]
    impl Embedder for NullEmbedder {
        fn name(&self) -> &str {
            "null"
        }
        async fn embed(&self, _text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
            Ok(None)
        }
    }

    struct StaticProvider(String);

    #[async_trait::async_trait]
    impl LlmProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                text: self.0.clone(),
                model: "static".to_string(),
            })
        }
    }

    /// Build a context whose LLM always answers with `reply`.
    pub(crate) fn test_context(reply: &str) -> (tempfile::TempDir, StageContext) {
        let dir = tempfile::tempdir().unwrap();
        let gateway = LlmGateway::new(
            Arc::new(StaticProvider(reply.to_string())),
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        );
        let duplicates = DuplicateStore::open(
            dir.path().join("historical_embeddings.json"),
            DedupConfig::default(),
            Arc::new(NullEmbedder),
        )
        .unwrap();
        let ctx = StageContext {
            gateway: Arc::new(gateway),
            duplicates: Arc::new(duplicates),
            search: Arc::new(SimulatedSearchProvider::default()),
            config: Arc::new(Config::default()),
        };
        (dir, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::test_context;
    use super::*;

    struct SlowStage;

    #[async_trait::async_trait]
    impl Stage for SlowStage {
        fn name(&self) -> &'static str {
            "slow"
        }
        async fn run(
            &self,
            _record: &mut ArticleRecord,
            _ctx: &StageContext,
        ) -> Result<String, StageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(status::SUCCESS.to_string())
        }
        fn apply_fallback(&self, record: &mut ArticleRecord) {
            record.summary = Some("fallback".to_string());
        }
    }

    struct FailingStage;

    #[async_trait::async_trait]
    impl Stage for FailingStage {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn run(
            &self,
            _record: &mut ArticleRecord,
            _ctx: &StageContext,
        ) -> Result<String, StageError> {
            Err(StageError::Llm(LlmError::BadJson {
                message: "nope".to_string(),
            }))
        }
        fn apply_fallback(&self, record: &mut ArticleRecord) {
            record.summary = Some("default block".to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_writes_failed_timeout_and_fallback() {
        let (_guard, ctx) = test_context("{}");
        let runner = StageRunner::new(Duration::from_secs(1));
        let mut record = ArticleRecord::new("t1");

        runner.execute(&SlowStage, &mut record, &ctx).await;

        assert_eq!(record.status("slow"), Some(status::FAILED_TIMEOUT));
        assert_eq!(record.summary.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn failure_writes_status_and_default_block() {
        let (_guard, ctx) = test_context("{}");
        let runner = StageRunner::new(Duration::from_secs(5));
        let mut record = ArticleRecord::new("t2");

        runner.execute(&FailingStage, &mut record, &ctx).await;

        assert_eq!(record.status("failing"), Some(status::FAILED_LLM_CALL));
        assert_eq!(record.summary.as_deref(), Some("default block"));
    }

    #[tokio::test]
    async fn success_records_returned_status() {
        struct OkStage;

        #[async_trait::async_trait]
        impl Stage for OkStage {
            fn name(&self) -> &'static str {
                "ok"
            }
            async fn run(
                &self,
                _record: &mut ArticleRecord,
                _ctx: &StageContext,
            ) -> Result<String, StageError> {
                Ok("UNIQUE_NO_HISTORY".to_string())
            }
        }

        let (_guard, ctx) = test_context("{}");
        let runner = StageRunner::new(Duration::from_secs(5));
        let mut record = ArticleRecord::new("t3");

        runner.execute(&OkStage, &mut record, &ctx).await;
        assert_eq!(record.status("ok"), Some("UNIQUE_NO_HISTORY"));
    }

    #[test]
    fn stage_error_status_mapping() {
        assert_eq!(
            StageError::InsufficientInput("x".to_string()).status(),
            status::SKIPPED_INSUFFICIENT_INPUT
        );
        assert_eq!(
            StageError::Other("x".to_string()).status(),
            status::FAILED_WITH_FALLBACK
        );
    }
}
