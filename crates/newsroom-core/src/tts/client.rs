//! HTTP client for the external asynchronous TTS service.
//!
//! Wire contract: `POST /tts` starts a task, `GET /tts/{task_id}` polls
//! it, `GET /tts-result/{run_id}` resolves the audio URL, and the audio
//! itself is downloaded as a binary stream.

use std::path::Path;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::config::TtsConfig;
use crate::error::TtsError;

/// Poll reply from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReply {
    /// Task still in flight (PENDING, PROCESSING, QUEUED, or unknown).
    InProgress,
    /// Task finished; `run_id` resolves the result.
    Success {
        /// Identifier for the result endpoint.
        run_id: String,
    },
    /// The service reported the task failed.
    Failed {
        /// Failure reason from the service.
        message: String,
    },
}

/// Trait abstracting the TTS service operations.
#[async_trait::async_trait]
pub trait TtsClient: Send + Sync {
    /// Submit text for synthesis; returns the opaque task ID.
    async fn create_task(&self, text: &str) -> Result<String, TtsError>;

    /// Poll a task's status.
    async fn poll_task(&self, task_id: &str) -> Result<PollReply, TtsError>;

    /// Resolve the audio download URL for a completed run.
    async fn fetch_result_url(&self, run_id: &str) -> Result<String, TtsError>;

    /// Stream the audio bytes to `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), TtsError>;
}

/// Production TTS client speaking the `x-api-key` protocol.
#[derive(Debug)]
pub struct HttpTtsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: u32,
    language_id: u32,
    gender: u32,
    age: u32,
}

impl HttpTtsClient {
    /// Build a client from configuration. Fails when the API key is absent.
    pub fn from_config(config: &TtsConfig) -> Result<Self, TtsError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TtsError::NotConfigured {
                message: "tts.api_key is not set".to_string(),
            })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            voice_id: config.voice_id,
            language_id: config.language_id,
            gender: config.gender,
            age: config.age,
        })
    }
}

#[async_trait::async_trait]
impl TtsClient for HttpTtsClient {
    async fn create_task(&self, text: &str) -> Result<String, TtsError> {
        let request = CreateRequest {
            text,
            voice_id: self.voice_id,
            language: self.language_id,
            gender: self.gender,
            age: self.age,
        };

        tracing::info!(voice_id = self.voice_id, chars = text.len(), "TTS task create");
        let response = self
            .client
            .post(format!("{}/tts", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Api { status, message });
        }

        let body: CreateResponse = response.json().await?;
        match body.task_id {
            Some(task_id) if !task_id.is_empty() => Ok(task_id),
            _ => Err(TtsError::TaskFailed {
                message: "create succeeded but no task_id in response".to_string(),
            }),
        }
    }

    async fn poll_task(&self, task_id: &str) -> Result<PollReply, TtsError> {
        let response = self
            .client
            .get(format!("{}/tts/{task_id}", self.base_url))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Api { status, message });
        }

        let body: PollResponse = response.json().await?;
        let status = body.status.unwrap_or_default().to_uppercase();
        match status.as_str() {
            "SUCCESS" => match body.run_id {
                Some(run_id) => Ok(PollReply::Success { run_id }),
                None => Err(TtsError::TaskFailed {
                    message: "task SUCCESS but missing run_id".to_string(),
                }),
            },
            "FAILURE" | "FAILED" => Ok(PollReply::Failed {
                message: body.error.unwrap_or_else(|| "unknown service error".to_string()),
            }),
            // PENDING / PROCESSING / QUEUED and anything unrecognized.
            _ => Ok(PollReply::InProgress),
        }
    }

    async fn fetch_result_url(&self, run_id: &str) -> Result<String, TtsError> {
        let response = self
            .client
            .get(format!("{}/tts-result/{run_id}", self.base_url))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Api { status, message });
        }

        let body: ResultResponse = response.json().await?;
        body.url
            .or(body.output_url)
            .or(body.audio_url)
            .ok_or_else(|| TtsError::TaskFailed {
                message: "result fetched but no audio URL".to_string(),
            })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), TtsError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(TtsError::Api {
                status,
                message: format!("audio download failed from {url}"),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TtsError::Save {
                    path: dest.display().to_string(),
                    source,
                })?;
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| TtsError::Save {
                path: dest.display().to_string(),
                source,
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| TtsError::Save {
                    path: dest.display().to_string(),
                    source,
                })?;
        }
        file.flush().await.map_err(|source| TtsError::Save {
            path: dest.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct CreateRequest<'a> {
    text: &'a str,
    voice_id: u32,
    language: u32,
    gender: u32,
    age: u32,
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Deserialize)]
struct PollResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    run_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ResultResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    output_url: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
}
