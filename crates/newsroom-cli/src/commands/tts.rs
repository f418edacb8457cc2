//! `newsroom tts`: generate or retry audio for processed articles.
//!
//! Scans the record store for articles without audio, skips records
//! whose previous failure was non-recoverable, and updates both the
//! record and the master index entry on success.

use std::time::Duration;

use newsroom_core::config::Config;
use newsroom_core::publish::index::MasterIndex;
use newsroom_core::record::store::RecordStore;
use newsroom_core::tts::client::HttpTtsClient;
use newsroom_core::tts::{TtsPollPolicy, TtsTaskManager};

use super::TtsArgs;

pub async fn execute(config: &Config, args: TtsArgs) -> anyhow::Result<()> {
    let client = HttpTtsClient::from_config(&config.tts)
        .map_err(|e| anyhow::anyhow!("TTS not usable: {e}"))?;
    let manager = TtsTaskManager::new(
        Box::new(client),
        TtsPollPolicy {
            interval: Duration::from_secs(config.tts.poll_interval_secs),
            max_attempts: config.tts.max_poll_attempts,
        },
        config.storage.audio_dir(),
    );

    let records = RecordStore::new(config.storage.processed_json_dir());
    let index = MasterIndex::new(config.storage.master_index_path());

    let ids = if args.id.is_empty() {
        records.list_ids()?
    } else {
        args.id
    };
    println!("Checking {} record(s) for missing audio...", ids.len());

    let mut generated = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for id in ids {
        let mut record = match records.load(&id) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(id = %id, error = %e, "skipping unreadable record");
                continue;
            }
        };

        if TtsTaskManager::should_skip(&record) {
            skipped += 1;
            continue;
        }

        let Some(text) = record
            .generated_article_body_md_final
            .clone()
            .or_else(|| record.assembled_article_body_md.clone())
        else {
            tracing::warn!(id = %id, "no article body; skipping TTS");
            skipped += 1;
            continue;
        };

        match manager.synthesize(&mut record, &text).await {
            Ok(()) => {
                generated += 1;
                if let Some(audio_url) = record.audio_url.clone() {
                    update_index_audio(&index, &id, &audio_url)?;
                }
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "TTS failed");
                failed += 1;
            }
        }
        // Save either way so failure reasons persist for the skip logic.
        records.save(&record)?;
    }

    println!("TTS run complete: {generated} generated, {failed} failed, {skipped} skipped.");
    Ok(())
}

/// Patch the audio URL onto the article's index entry, if it has one.
fn update_index_audio(index: &MasterIndex, id: &str, audio_url: &str) -> anyhow::Result<()> {
    let Some(mut entry) = index.load()?.into_iter().find(|a| a.id == id) else {
        tracing::warn!(id, "article not in master index; audio URL not projected");
        return Ok(());
    };
    entry.audio_url = Some(audio_url.to_string());
    index.upsert(entry)?;
    Ok(())
}
