//! Default values for all configuration sections.
//!
//! Users only need to supply credentials; everything else has a working
//! default matching the pipeline's interface contract.

use std::path::PathBuf;

use super::{
    DedupConfig, EmbeddingConfig, LlmConfig, PipelineConfig, ResearchConfig, SiteConfig,
    StorageConfig, TtsConfig,
};

pub(super) fn llm_endpoint() -> String {
    "https://api.deepseek.com".to_string()
}

pub(super) fn llm_model() -> String {
    "deepseek-chat".to_string()
}

pub(super) fn max_retries() -> u32 {
    3
}

pub(super) fn base_retry_delay_ms() -> u64 {
    1000
}

pub(super) fn llm_timeout_secs() -> u64 {
    120
}

pub(super) fn embedding_model() -> String {
    "all-mpnet-base-v2".to_string()
}

pub(super) fn embedding_min_text_length() -> usize {
    75
}

pub(super) fn threshold_duplicate() -> f32 {
    0.92
}

pub(super) fn threshold_near_duplicate() -> f32 {
    0.82
}

pub(super) fn dedup_min_text_length() -> usize {
    75
}

pub(super) fn dedup_max_text_snippet() -> usize {
    2000
}

pub(super) fn max_article_age_hours() -> u32 {
    40
}

pub(super) fn tts_endpoint() -> String {
    "https://client.camb.ai/apis".to_string()
}

pub(super) fn tts_voice_id() -> u32 {
    6104
}

pub(super) fn tts_language_id() -> u32 {
    1
}

pub(super) fn tts_gender() -> u32 {
    2
}

pub(super) fn tts_poll_interval_secs() -> u64 {
    3
}

pub(super) fn tts_max_poll_attempts() -> u32 {
    60
}

pub(super) fn site_base_url() -> String {
    "https://yoursite.example.com".to_string()
}

pub(super) fn site_name() -> String {
    "Newsroom".to_string()
}

pub(super) fn site_logo_url() -> String {
    "https://via.placeholder.com/200x60.png?text=Newsroom".to_string()
}

pub(super) fn author_name() -> String {
    "Newsroom AI Team".to_string()
}

pub(super) fn max_home_page_articles() -> usize {
    20
}

pub(super) fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

pub(super) fn public_dir() -> PathBuf {
    PathBuf::from("public")
}

pub(super) fn workers() -> usize {
    4
}

pub(super) fn stage_timeout_secs() -> u64 {
    240
}

pub(super) fn record_budget_secs() -> u64 {
    1800
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: llm_endpoint(),
            model: llm_model(),
            max_retries: max_retries(),
            base_retry_delay_ms: base_retry_delay_ms(),
            timeout_secs: llm_timeout_secs(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: embedding_model(),
            endpoint: None,
            api_key: None,
            min_text_length: embedding_min_text_length(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold_duplicate: threshold_duplicate(),
            threshold_near_duplicate: threshold_near_duplicate(),
            min_text_length: dedup_min_text_length(),
            max_text_snippet: dedup_max_text_snippet(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_article_age_hours: max_article_age_hours(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: tts_endpoint(),
            voice_id: tts_voice_id(),
            language_id: tts_language_id(),
            gender: tts_gender(),
            age: 0,
            poll_interval_secs: tts_poll_interval_secs(),
            max_poll_attempts: tts_max_poll_attempts(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: site_base_url(),
            name: site_name(),
            logo_url: site_logo_url(),
            author_name: author_name(),
            favicon_url: None,
            max_home_page_articles: max_home_page_articles(),
            image_caption_style: super::CaptionStyle::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir(),
            public_dir: public_dir(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: workers(),
            stage_timeout_secs: stage_timeout_secs(),
            record_budget_secs: record_budget_secs(),
        }
    }
}
