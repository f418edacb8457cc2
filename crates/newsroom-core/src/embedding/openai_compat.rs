//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Caches vectors in memory keyed by the sha256 of the input text, so a
//! record re-entering the pipeline after a crash does not re-bill the
//! same fingerprint.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::error::EmbeddingError;

/// An embedder using the OpenAI embeddings API format.
pub struct OpenAiCompatEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    min_text_length: usize,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl OpenAiCompatEmbedder {
    /// Create a new embedder.
    pub fn new(base_url: String, api_key: String, model: String, min_text_length: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            min_text_length,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiCompatEmbedder {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.len() < self.min_text_length {
            tracing::debug!(
                chars = trimmed.len(),
                min = self.min_text_length,
                "text too short to embed",
            );
            return Ok(None);
        }

        let key = Self::cache_key(trimmed);
        if let Some(hit) = self.cache.lock().expect("embed cache poisoned").get(&key) {
            tracing::debug!("embedding cache hit");
            return Ok(Some(hit.clone()));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: trimmed,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api { status, message });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(format!("failed to parse response: {e}")))?;

        let Some(vector) = body.data.into_iter().next().map(|d| d.embedding) else {
            return Err(EmbeddingError::Parse("response carried no vectors".to_string()));
        };

        tracing::debug!(dims = vector.len(), "embedding received");
        self.cache
            .lock()
            .expect("embed cache poisoned")
            .insert(key, vector.clone());
        Ok(Some(vector))
    }
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}
