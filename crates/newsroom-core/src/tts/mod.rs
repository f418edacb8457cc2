//! TTS task management: the trigger/poll/download state machine.
//!
//! One task per article. The manager drives the external service through
//! `Created -> Polling -> Fetching -> Downloading -> Done`, backing off
//! on rate limits and server errors, and records every transition on the
//! article so a re-run can tell recoverable failures from permanent ones.

pub mod client;

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::TtsError;
use crate::record::{ArticleRecord, TtsTaskState};
use self::client::{PollReply, TtsClient};

/// Maximum characters submitted to the service.
const MAX_TTS_CHARS: usize = 4500;

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"))
}

/// Strip markdown structure (headings, emphasis, links) ahead of speech
/// synthesis and cap the length.
fn clean_text_for_speech(text: &str) -> String {
    let stripped = text
        .replace("###", "")
        .replace("##", "")
        .replace('*', "")
        .replace('_', "");
    let without_links = link_re().replace_all(&stripped, "$1");
    let trimmed = without_links.trim();
    trimmed.chars().take(MAX_TTS_CHARS).collect()
}

/// Infer the audio file extension from a download URL, dropping query
/// parameters. Falls back to `.wav` when absent or implausible.
fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.').map(|(_, e)| e))
        .unwrap_or("");
    if ext.is_empty() || ext.len() > 4 {
        "wav".to_string()
    } else {
        ext.to_lowercase()
    }
}

/// Knobs for the polling loop.
#[derive(Debug, Clone)]
pub struct TtsPollPolicy {
    /// Base interval between polls.
    pub interval: Duration,
    /// Maximum poll attempts before declaring a timeout.
    pub max_attempts: u32,
}

impl Default for TtsPollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 60,
        }
    }
}

/// Drives TTS tasks for articles.
pub struct TtsTaskManager {
    client: Box<dyn TtsClient>,
    policy: TtsPollPolicy,
    audio_dir: PathBuf,
}

impl TtsTaskManager {
    /// Create a manager saving audio under `audio_dir`.
    pub fn new(client: Box<dyn TtsClient>, policy: TtsPollPolicy, audio_dir: PathBuf) -> Self {
        Self {
            client,
            policy,
            audio_dir,
        }
    }

    /// Whether a re-invocation should skip this record.
    ///
    /// Audio already produced, empty source text, and an explicit FAILURE
    /// from the service are permanent; network faults and poll timeouts
    /// are worth another attempt.
    pub fn should_skip(record: &ArticleRecord) -> bool {
        if record.audio_url.is_some() {
            return true;
        }
        match record.tts_task_state {
            TtsTaskState::Failed => {
                let recoverable = record
                    .tts_error
                    .as_deref()
                    .is_some_and(|e| e.contains("network") || e.contains("timed out"));
                !recoverable
            }
            _ => false,
        }
    }

    /// Run the full state machine for one article.
    ///
    /// On success `audio_url` is set to the relative web path
    /// (`audio/{id}.{ext}`). Failures are recorded on the article and
    /// returned; the caller decides whether they fail the pipeline.
    pub async fn synthesize(
        &self,
        record: &mut ArticleRecord,
        text: &str,
    ) -> Result<(), TtsError> {
        let cleaned = clean_text_for_speech(text);
        if cleaned.is_empty() {
            record.tts_task_state = TtsTaskState::Failed;
            record.tts_error = Some("input text was empty after cleaning".to_string());
            return Err(TtsError::EmptyText);
        }

        record.tts_task_state = TtsTaskState::Idle;
        record.audio_url = None;

        let task_id = match self.client.create_task(&cleaned).await {
            Ok(id) => id,
            Err(e) => return Err(self.record_failure(record, e)),
        };
        record.tts_task_state = TtsTaskState::Created;
        tracing::info!(id = %record.id, task_id = %task_id, "TTS task created");

        record.tts_task_state = TtsTaskState::Polling;
        let run_id = match self.poll_until_done(record, &task_id).await {
            Ok(run_id) => run_id,
            Err(e) => return Err(e),
        };

        record.tts_task_state = TtsTaskState::Fetching;
        let audio_url = match self.client.fetch_result_url(&run_id).await {
            Ok(url) => url,
            Err(e) => return Err(self.record_failure(record, e)),
        };

        record.tts_task_state = TtsTaskState::Downloading;
        let ext = extension_from_url(&audio_url);
        let filename = format!("{}.{ext}", record.id);
        let dest = self.audio_dir.join(&filename);
        if let Err(e) = self.client.download(&audio_url, &dest).await {
            return Err(self.record_failure(record, e));
        }

        record.tts_task_state = TtsTaskState::Done;
        record.audio_url = Some(format!("audio/{filename}"));
        record.tts_error = None;
        tracing::info!(id = %record.id, path = %dest.display(), "TTS audio saved");
        Ok(())
    }

    async fn poll_until_done(
        &self,
        record: &mut ArticleRecord,
        task_id: &str,
    ) -> Result<String, TtsError> {
        let mut attempt = 0u32;
        while attempt < self.policy.max_attempts {
            attempt += 1;
            match self.client.poll_task(task_id).await {
                Ok(PollReply::Success { run_id }) => return Ok(run_id),
                Ok(PollReply::Failed { message }) => {
                    record.tts_task_state = TtsTaskState::Failed;
                    record.tts_error = Some(format!("TTS task failed: {message}"));
                    return Err(TtsError::TaskFailed { message });
                }
                Ok(PollReply::InProgress) => {
                    tracing::debug!(task_id, attempt, "TTS task still in progress");
                    tokio::time::sleep(self.policy.interval).await;
                }
                Err(TtsError::Api { status: 429, .. }) => {
                    tracing::warn!(task_id, "rate limited polling TTS task; backing off");
                    tokio::time::sleep(self.policy.interval * 3).await;
                }
                Err(TtsError::Api { status, .. }) if status >= 500 => {
                    tracing::warn!(task_id, status, "server error polling TTS task; backing off");
                    tokio::time::sleep(self.policy.interval * 2).await;
                }
                Err(TtsError::Request(e)) => {
                    tracing::warn!(task_id, error = %e, "network error polling TTS task");
                    tokio::time::sleep(self.policy.interval * 2).await;
                }
                Err(e) => {
                    return Err(self.record_failure(record, e));
                }
            }
        }

        record.tts_task_state = TtsTaskState::TimedOut;
        record.tts_error = Some(format!(
            "TTS task polling timed out after {} attempts",
            self.policy.max_attempts
        ));
        Err(TtsError::PollTimeout {
            attempts: self.policy.max_attempts,
        })
    }

    fn record_failure(&self, record: &mut ArticleRecord, error: TtsError) -> TtsError {
        record.tts_task_state = TtsTaskState::Failed;
        record.tts_error = Some(match &error {
            TtsError::Request(e) => format!("network error: {e}"),
            other => other.to_string(),
        });
        record.audio_url = None;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted TTS client driven by a queue of poll replies.
    struct ScriptedTts {
        polls: Mutex<Vec<Result<PollReply, TtsError>>>,
        poll_count: AtomicU32,
        audio_url: String,
    }

    impl ScriptedTts {
        fn new(polls: Vec<Result<PollReply, TtsError>>, audio_url: &str) -> Self {
            Self {
                polls: Mutex::new(polls),
                poll_count: AtomicU32::new(0),
                audio_url: audio_url.to_string(),
            }
        }
    }

    #[async_trait::async_trait]
    impl TtsClient for ScriptedTts {
        async fn create_task(&self, _text: &str) -> Result<String, TtsError> {
            Ok("T".to_string())
        }

        async fn poll_task(&self, _task_id: &str) -> Result<PollReply, TtsError> {
            self.poll_count.fetch_add(1, Ordering::SeqCst);
            let mut polls = self.polls.lock().unwrap();
            if polls.is_empty() {
                Ok(PollReply::InProgress)
            } else {
                polls.remove(0)
            }
        }

        async fn fetch_result_url(&self, run_id: &str) -> Result<String, TtsError> {
            assert_eq!(run_id, "R");
            Ok(self.audio_url.clone())
        }

        async fn download(&self, _url: &str, dest: &Path) -> Result<(), TtsError> {
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            std::fs::write(dest, b"audio-bytes").unwrap();
            Ok(())
        }
    }

    fn manager(client: ScriptedTts, dir: &Path) -> TtsTaskManager {
        TtsTaskManager::new(
            Box::new(client),
            TtsPollPolicy {
                interval: Duration::from_secs(3),
                max_attempts: 60,
            },
            dir.to_path_buf(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_two_processing_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedTts::new(
            vec![
                Ok(PollReply::InProgress),
                Ok(PollReply::InProgress),
                Ok(PollReply::Success { run_id: "R".to_string() }),
            ],
            "https://cdn.example.com/out/audio.wav?sig=abc",
        );
        let mgr = manager(client, &dir.path().join("audio"));
        let mut record = ArticleRecord::new("a1");

        mgr.synthesize(&mut record, "## Title\n\nSome **bold** [link](https://x.com) text.")
            .await
            .unwrap();

        assert_eq!(record.tts_task_state, TtsTaskState::Done);
        assert_eq!(record.audio_url.as_deref(), Some("audio/a1.wav"));
        assert!(record.tts_error.is_none());
        assert!(dir.path().join("audio/a1.wav").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn sixty_processing_replies_time_out() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedTts::new(vec![], "unused");
        let mgr = manager(client, dir.path());
        let mut record = ArticleRecord::new("a2");

        let err = mgr.synthesize(&mut record, "Plenty of text.").await.unwrap_err();

        assert!(matches!(err, TtsError::PollTimeout { attempts: 60 }));
        assert_eq!(record.tts_task_state, TtsTaskState::TimedOut);
        assert!(record.audio_url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn service_failure_is_recorded_as_permanent() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedTts::new(
            vec![Ok(PollReply::Failed { message: "voice unavailable".to_string() })],
            "unused",
        );
        let mgr = manager(client, dir.path());
        let mut record = ArticleRecord::new("a3");

        mgr.synthesize(&mut record, "Text.").await.unwrap_err();

        assert_eq!(record.tts_task_state, TtsTaskState::Failed);
        assert!(TtsTaskManager::should_skip(&record));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_back_off_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedTts::new(
            vec![
                Err(TtsError::Api { status: 429, message: String::new() }),
                Err(TtsError::Api { status: 503, message: String::new() }),
                Ok(PollReply::Success { run_id: "R".to_string() }),
            ],
            "https://cdn.example.com/audio.mp3",
        );
        let mgr = manager(client, &dir.path().join("audio"));
        let mut record = ArticleRecord::new("a4");

        mgr.synthesize(&mut record, "Text to speak.").await.unwrap();

        assert_eq!(record.audio_url.as_deref(), Some("audio/a4.mp3"));
    }

    #[tokio::test]
    async fn empty_text_is_permanent_failure() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedTts::new(vec![], "unused");
        let mgr = manager(client, dir.path());
        let mut record = ArticleRecord::new("a5");

        let err = mgr.synthesize(&mut record, "** __ ##").await.unwrap_err();

        assert!(matches!(err, TtsError::EmptyText));
        assert!(TtsTaskManager::should_skip(&record));
    }

    #[test]
    fn skip_logic_distinguishes_recoverable_failures() {
        let mut record = ArticleRecord::new("a6");
        assert!(!TtsTaskManager::should_skip(&record));

        record.audio_url = Some("audio/a6.wav".to_string());
        assert!(TtsTaskManager::should_skip(&record));

        let mut failed = ArticleRecord::new("a7");
        failed.tts_task_state = TtsTaskState::Failed;
        failed.tts_error = Some("network error: connection reset".to_string());
        assert!(!TtsTaskManager::should_skip(&failed));

        failed.tts_error = Some("TTS task failed: voice unavailable".to_string());
        assert!(TtsTaskManager::should_skip(&failed));

        // A timed-out poll is worth retrying.
        let mut timed_out = ArticleRecord::new("a8");
        timed_out.tts_task_state = TtsTaskState::TimedOut;
        assert!(!TtsTaskManager::should_skip(&timed_out));
    }

    #[test]
    fn extension_inference() {
        assert_eq!(extension_from_url("https://x.com/a/audio.wav?sig=1"), "wav");
        assert_eq!(extension_from_url("https://x.com/a/audio.MP3"), "mp3");
        assert_eq!(extension_from_url("https://x.com/a/audio"), "wav");
        assert_eq!(extension_from_url("https://x.com/a/file.longext"), "wav");
    }

    #[test]
    fn speech_cleaning_strips_markdown() {
        let cleaned = clean_text_for_speech("## Head\n\n**bold** and [link text](https://x.com)");
        assert!(!cleaned.contains('#'));
        assert!(!cleaned.contains('*'));
        assert!(cleaned.contains("link text"));
        assert!(!cleaned.contains("https://x.com"));
    }
}
