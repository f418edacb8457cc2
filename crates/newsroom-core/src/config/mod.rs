//! Configuration management for Newsroom.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.newsroom/config.toml`)
//! 3. Environment variable overrides (`NEWSROOM_` prefix, plus the flat
//!    legacy names like `LLM_API_KEY` and `DEDUP_THRESHOLD_DUPLICATE`)
//!
//! CLI flag overrides are applied by the binary crate after loading.

mod defaults;
mod env_overrides;
mod validation;


use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the editorial pipeline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// LLM gateway settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Deduplication thresholds.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Web research filters.
    #[serde(default)]
    pub research: ResearchConfig,

    /// TTS service settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Site identity and rendering options.
    #[serde(default)]
    pub site: SiteConfig,

    /// Social poster credentials.
    #[serde(default)]
    pub social: SocialConfig,

    /// Data and public directory layout.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pipeline concurrency and budgets.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// LLM gateway credentials, endpoint, and retry knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key for the chat-completions endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions endpoint.
    #[serde(default = "defaults::llm_endpoint")]
    pub endpoint: String,

    /// Model name sent with every request.
    #[serde(default = "defaults::llm_model")]
    pub model: String,

    /// Maximum attempts for retryable failures.
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "defaults::base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Per-call timeout, in seconds.
    #[serde(default = "defaults::llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Embedding service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    #[serde(default = "defaults::embedding_model")]
    pub model_name: String,

    /// Base URL of the embeddings endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key for the embeddings endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Minimum cleaned-text length to embed at all.
    #[serde(default = "defaults::embedding_min_text_length")]
    pub min_text_length: usize,
}

/// Similarity thresholds for the duplicate store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DedupConfig {
    /// Cosine similarity at or above which an article is a hard duplicate.
    #[serde(default = "defaults::threshold_duplicate")]
    pub threshold_duplicate: f32,

    /// Cosine similarity at or above which an article is a near-duplicate.
    #[serde(default = "defaults::threshold_near_duplicate")]
    pub threshold_near_duplicate: f32,

    /// Minimum cleaned fingerprint length; shorter texts skip dedup.
    #[serde(default = "defaults::dedup_min_text_length")]
    pub min_text_length: usize,

    /// Maximum raw-text prefix folded into the fingerprint.
    #[serde(default = "defaults::dedup_max_text_snippet")]
    pub max_text_snippet: usize,
}

/// Web research recency filters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResearchConfig {
    /// Candidates older than this are discarded at ingest.
    #[serde(default = "defaults::max_article_age_hours")]
    pub max_article_age_hours: u32,
}

/// TTS service credentials and polling knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsConfig {
    /// Whether the TTS stage runs at all.
    #[serde(default)]
    pub enabled: bool,

    /// API key sent in the `x-api-key` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the TTS service.
    #[serde(default = "defaults::tts_endpoint")]
    pub endpoint: String,

    /// Voice identifier.
    #[serde(default = "defaults::tts_voice_id")]
    pub voice_id: u32,

    /// Language identifier.
    #[serde(default = "defaults::tts_language_id")]
    pub language_id: u32,

    /// Voice gender code.
    #[serde(default = "defaults::tts_gender")]
    pub gender: u32,

    /// Voice age code.
    #[serde(default)]
    pub age: u32,

    /// Seconds between status polls.
    #[serde(default = "defaults::tts_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum status polls before the task is declared timed out.
    #[serde(default = "defaults::tts_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// How image captions are rendered into the article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    /// `*caption*` on its own line (default).
    #[default]
    MarkdownItalic,
    /// `<figcaption>caption</figcaption>`.
    HtmlFigcaption,
    /// The bare caption text.
    Plain,
}

/// Site identity used by the publisher and JSON-LD synthesis.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Canonical base URL, no trailing slash.
    #[serde(default = "defaults::site_base_url")]
    pub base_url: String,

    /// Site display name.
    #[serde(default = "defaults::site_name")]
    pub name: String,

    /// Publisher logo URL for JSON-LD.
    #[serde(default = "defaults::site_logo_url")]
    pub logo_url: String,

    /// Byline used when a record carries no author.
    #[serde(default = "defaults::author_name")]
    pub author_name: String,

    /// Favicon URL for rendered pages.
    #[serde(default)]
    pub favicon_url: Option<String>,

    /// Number of articles surfaced on the home page projection.
    #[serde(default = "defaults::max_home_page_articles")]
    pub max_home_page_articles: usize,

    /// Caption rendering style for integrated images.
    #[serde(default)]
    pub image_caption_style: CaptionStyle,
}

/// Social poster credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SocialConfig {
    /// Whether publishing also posts to the social channel.
    #[serde(default)]
    pub enabled: bool,

    /// Consumer API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Consumer API secret.
    #[serde(default)]
    pub api_secret: Option<String>,

    /// User access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// User access token secret.
    #[serde(default)]
    pub access_secret: Option<String>,
}

/// Directory layout for persisted state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root for records, the duplicate store, and raw ingest documents.
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Root for rendered articles, the master index, and audio files.
    #[serde(default = "defaults::public_dir")]
    pub public_dir: PathBuf,
}

impl StorageConfig {
    /// Directory of per-article records (`{id}.json`).
    pub fn processed_json_dir(&self) -> PathBuf {
        self.data_dir.join("processed_json")
    }

    /// Path of the duplicate store document.
    pub fn historical_embeddings_path(&self) -> PathBuf {
        self.data_dir.join("historical_embeddings.json")
    }

    /// Directory of raw ingest documents for manually added items.
    pub fn raw_web_research_dir(&self) -> PathBuf {
        self.data_dir.join("raw_web_research")
    }

    /// Path of the master article index.
    pub fn master_index_path(&self) -> PathBuf {
        self.public_dir.join("all_articles.json")
    }

    /// Directory of rendered article pages.
    pub fn articles_dir(&self) -> PathBuf {
        self.public_dir.join("articles")
    }

    /// Directory of downloaded TTS audio files.
    pub fn audio_dir(&self) -> PathBuf {
        self.public_dir.join("audio")
    }
}

/// Pipeline concurrency and time budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Number of parallel workers over the record queue.
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Wall-clock timeout for a single stage, in seconds.
    #[serde(default = "defaults::stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Wall-clock budget for one record's full traversal, in seconds.
    #[serde(default = "defaults::record_budget_secs")]
    pub record_budget_secs: u64,
}

impl Config {
    /// Default config file path (`~/.newsroom/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".newsroom")
            .join("config.toml")
    }

    /// Load configuration: defaults, then the TOML file if present,
    /// then environment overrides.
    ///
    /// A missing file is not an error (defaults + env still apply);
    /// an unreadable or unparseable file is.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(Self::default_path, expand_tilde);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::ParseError { source })?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
