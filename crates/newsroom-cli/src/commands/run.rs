//! `newsroom run`: ingest pending candidates and drive them through the
//! pipeline with parallel workers.

use std::sync::Arc;
use std::time::Duration;

use newsroom_core::config::Config;
use newsroom_core::dedup::DuplicateStore;
use newsroom_core::embedding::openai_compat::OpenAiCompatEmbedder;
use newsroom_core::llm::gateway::{LlmGateway, RetryPolicy};
use newsroom_core::llm::openai_compat::OpenAiCompatProvider;
use newsroom_core::pipeline::{ingest, worker, Pipeline};
use newsroom_core::publish::Publisher;
use newsroom_core::record::store::RecordStore;
use newsroom_core::record::TerminalStatus;
use newsroom_core::search::SimulatedSearchProvider;
use newsroom_core::social::{HttpSocialClient, SocialClient};
use newsroom_core::stages::StageContext;
use newsroom_core::tts::client::HttpTtsClient;
use newsroom_core::tts::{TtsPollPolicy, TtsTaskManager};

use super::RunArgs;

pub async fn execute(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    let config = Arc::new(config.clone());
    let pipeline = Arc::new(build_pipeline(&config)?);

    let ids = if args.id.is_empty() {
        ingest_pending(&config, &pipeline)?
    } else {
        args.id
    };

    if ids.is_empty() {
        println!("Nothing to process.");
        return Ok(());
    }

    let workers = args.workers.unwrap_or(config.pipeline.workers);
    println!("Processing {} record(s) with {workers} worker(s)...", ids.len());

    let report = worker::run_batch(Arc::clone(&pipeline), ids, workers).await;

    println!(
        "Done: {} published, {} duplicates, {} rejected (boring), {} rejected (adjudicator), \
         {} flagged for review, {} failed.",
        report.count(TerminalStatus::TerminalPublished),
        report.count(TerminalStatus::TerminalDuplicate),
        report.count(TerminalStatus::TerminalRejectedBoring),
        report.count(TerminalStatus::TerminalRejectedAdjudicator),
        report.count(TerminalStatus::TerminalFlaggedForReview),
        report.failed_ids.len(),
    );
    if !report.failed_ids.is_empty() {
        println!("Failed IDs: {}", report.failed_ids.join(", "));
    }
    Ok(())
}

/// Scan `raw_web_research/` for pending candidates and create records
/// for any without one. Records already at a terminal status are skipped.
fn ingest_pending(config: &Config, pipeline: &Pipeline) -> anyhow::Result<Vec<String>> {
    let docs = ingest::load_pending_docs(&config.storage, &config.research)?;
    let mut ids = Vec::new();

    for doc in docs {
        match pipeline.records().load(&doc.id) {
            Ok(existing) if existing.terminal_status.is_some() => {
                tracing::debug!(id = %doc.id, "already at terminal status; skipping");
            }
            Ok(_) => ids.push(doc.id),
            Err(_) => {
                let record = ingest::record_from_doc(&doc);
                pipeline.records().save(&record)?;
                ids.push(doc.id);
            }
        }
    }
    Ok(ids)
}

fn build_pipeline(config: &Arc<Config>) -> anyhow::Result<Pipeline> {
    let provider = OpenAiCompatProvider::new(
        config.llm.endpoint.clone(),
        config.llm.api_key.clone().unwrap_or_default(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    );
    let gateway = LlmGateway::new(
        Arc::new(provider),
        RetryPolicy {
            max_attempts: config.llm.max_retries,
            base_delay: Duration::from_millis(config.llm.base_retry_delay_ms),
        },
    );

    let embedder = OpenAiCompatEmbedder::new(
        config
            .embedding
            .endpoint
            .clone()
            .unwrap_or_else(|| config.llm.endpoint.clone()),
        config
            .embedding
            .api_key
            .clone()
            .or_else(|| config.llm.api_key.clone())
            .unwrap_or_default(),
        config.embedding.model_name.clone(),
        config.embedding.min_text_length,
    );
    let duplicates = DuplicateStore::open(
        config.storage.historical_embeddings_path(),
        config.dedup.clone(),
        Arc::new(embedder),
    )?;

    let ctx = StageContext {
        gateway: Arc::new(gateway),
        duplicates: Arc::new(duplicates),
        search: Arc::new(SimulatedSearchProvider::default()),
        config: Arc::clone(config),
    };

    let tts = if config.tts.enabled {
        let client = HttpTtsClient::from_config(&config.tts)?;
        Some(Arc::new(TtsTaskManager::new(
            Box::new(client),
            TtsPollPolicy {
                interval: Duration::from_secs(config.tts.poll_interval_secs),
                max_attempts: config.tts.max_poll_attempts,
            },
            config.storage.audio_dir(),
        )))
    } else {
        None
    };

    let social: Option<Arc<dyn SocialClient>> = if config.social.enabled {
        Some(Arc::new(HttpSocialClient::from_config(&config.social)?))
    } else {
        None
    };

    Ok(Pipeline::new(
        RecordStore::new(config.storage.processed_json_dir()),
        ctx,
        Publisher::new(config.site.clone(), &config.storage),
        tts,
        social,
        Arc::clone(config),
    ))
}
