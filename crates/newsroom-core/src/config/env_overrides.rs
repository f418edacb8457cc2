//! Environment variable overrides for configuration.

use std::env;

use super::{CaptionStyle, Config};
use crate::error::ConfigError;

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Two naming families are honored, checked in this order:
    /// 1. Flat legacy names (`LLM_API_KEY`, `DEDUP_THRESHOLD_DUPLICATE`,
    ///    `TTS_POLL_INTERVAL_SEC`, ...), matching the original deployment.
    /// 2. `NEWSROOM_` prefix with double underscores separating nested keys
    ///    (e.g. `NEWSROOM_LLM__API_KEY`).
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // LLM gateway
        if let Some(val) = first_of(&["LLM_API_KEY", "NEWSROOM_LLM__API_KEY"]) {
            self.llm.api_key = Some(val);
        }
        if let Some(val) = first_of(&["LLM_ENDPOINT", "NEWSROOM_LLM__ENDPOINT"]) {
            self.llm.endpoint = val;
        }
        if let Some(val) = first_of(&["LLM_MODEL", "NEWSROOM_LLM__MODEL"]) {
            self.llm.model = val;
        }
        if let Some(val) = first_of(&["MAX_RETRIES_API", "NEWSROOM_LLM__MAX_RETRIES"]) {
            self.llm.max_retries = parse_env_u32("MAX_RETRIES_API", &val)?;
        }
        if let Some(val) = first_of(&["BASE_RETRY_DELAY", "NEWSROOM_LLM__BASE_RETRY_DELAY_MS"]) {
            // Legacy name is in seconds, prefixed name in milliseconds.
            self.llm.base_retry_delay_ms = if env::var("BASE_RETRY_DELAY").is_ok() {
                parse_env_u64("BASE_RETRY_DELAY", &val)? * 1000
            } else {
                parse_env_u64("NEWSROOM_LLM__BASE_RETRY_DELAY_MS", &val)?
            };
        }

        // Embedding
        if let Some(val) = first_of(&["EMBEDDING_MODEL_NAME", "NEWSROOM_EMBEDDING__MODEL_NAME"]) {
            self.embedding.model_name = val;
        }
        if let Some(val) = first_of(&["EMBEDDING_ENDPOINT", "NEWSROOM_EMBEDDING__ENDPOINT"]) {
            self.embedding.endpoint = Some(val);
        }
        if let Some(val) = first_of(&["EMBEDDING_API_KEY", "NEWSROOM_EMBEDDING__API_KEY"]) {
            self.embedding.api_key = Some(val);
        }

        // Dedup
        if let Some(val) = first_of(&[
            "DEDUP_THRESHOLD_DUPLICATE",
            "NEWSROOM_DEDUP__THRESHOLD_DUPLICATE",
        ]) {
            self.dedup.threshold_duplicate = parse_env_f32("DEDUP_THRESHOLD_DUPLICATE", &val)?;
        }
        if let Some(val) = first_of(&[
            "DEDUP_THRESHOLD_NEARDUPLICATE",
            "NEWSROOM_DEDUP__THRESHOLD_NEAR_DUPLICATE",
        ]) {
            self.dedup.threshold_near_duplicate =
                parse_env_f32("DEDUP_THRESHOLD_NEARDUPLICATE", &val)?;
        }
        if let Some(val) = first_of(&["DEDUP_MIN_TEXT_LENGTH", "NEWSROOM_DEDUP__MIN_TEXT_LENGTH"]) {
            self.dedup.min_text_length = parse_env_usize("DEDUP_MIN_TEXT_LENGTH", &val)?;
            self.embedding.min_text_length = self.dedup.min_text_length;
        }
        if let Some(val) = first_of(&["DEDUP_MAX_TEXT_SNIPPET", "NEWSROOM_DEDUP__MAX_TEXT_SNIPPET"])
        {
            self.dedup.max_text_snippet = parse_env_usize("DEDUP_MAX_TEXT_SNIPPET", &val)?;
        }

        // Research
        if let Some(val) = first_of(&[
            "MAX_ARTICLE_AGE_HOURS",
            "NEWSROOM_RESEARCH__MAX_ARTICLE_AGE_HOURS",
        ]) {
            self.research.max_article_age_hours = parse_env_u32("MAX_ARTICLE_AGE_HOURS", &val)?;
        }

        // TTS
        if let Some(val) = first_of(&["TTS_API_KEY", "NEWSROOM_TTS__API_KEY"]) {
            self.tts.api_key = Some(val);
            self.tts.enabled = true;
        }
        if let Some(val) = first_of(&["TTS_ENDPOINT", "NEWSROOM_TTS__ENDPOINT"]) {
            self.tts.endpoint = val;
        }
        if let Some(val) = first_of(&["TTS_VOICE_ID", "NEWSROOM_TTS__VOICE_ID"]) {
            self.tts.voice_id = parse_env_u32("TTS_VOICE_ID", &val)?;
        }
        if let Some(val) = first_of(&["TTS_LANGUAGE_ID", "NEWSROOM_TTS__LANGUAGE_ID"]) {
            self.tts.language_id = parse_env_u32("TTS_LANGUAGE_ID", &val)?;
        }
        if let Some(val) = first_of(&["TTS_POLL_INTERVAL_SEC", "NEWSROOM_TTS__POLL_INTERVAL_SECS"])
        {
            self.tts.poll_interval_secs = parse_env_u64("TTS_POLL_INTERVAL_SEC", &val)?;
        }
        if let Some(val) = first_of(&["TTS_MAX_POLL_ATTEMPTS", "NEWSROOM_TTS__MAX_POLL_ATTEMPTS"]) {
            self.tts.max_poll_attempts = parse_env_u32("TTS_MAX_POLL_ATTEMPTS", &val)?;
        }

        // Site
        if let Some(val) = first_of(&["SITE_BASE_URL", "NEWSROOM_SITE__BASE_URL"]) {
            self.site.base_url = val.trim_end_matches('/').to_string();
        }
        if let Some(val) = first_of(&["SITE_NAME", "NEWSROOM_SITE__NAME"]) {
            self.site.name = val;
        }
        if let Some(val) = first_of(&["SITE_LOGO_URL", "NEWSROOM_SITE__LOGO_URL"]) {
            self.site.logo_url = val;
        }
        if let Some(val) = first_of(&["AUTHOR_NAME_DEFAULT", "NEWSROOM_SITE__AUTHOR_NAME"]) {
            self.site.author_name = val;
        }
        if let Some(val) = first_of(&["FAVICON_URL", "NEWSROOM_SITE__FAVICON_URL"]) {
            self.site.favicon_url = Some(val);
        }
        if let Some(val) = first_of(&[
            "MAX_HOME_PAGE_ARTICLES",
            "NEWSROOM_SITE__MAX_HOME_PAGE_ARTICLES",
        ]) {
            self.site.max_home_page_articles = parse_env_usize("MAX_HOME_PAGE_ARTICLES", &val)?;
        }
        if let Some(val) = first_of(&["IMAGE_CAPTION_STYLE", "NEWSROOM_SITE__IMAGE_CAPTION_STYLE"])
        {
            self.site.image_caption_style = match val.to_lowercase().as_str() {
                "markdown_italic" => CaptionStyle::MarkdownItalic,
                "html_figcaption" => CaptionStyle::HtmlFigcaption,
                "plain" => CaptionStyle::Plain,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "site.image_caption_style".to_string(),
                        message: format!(
                            "invalid style '{other}', expected markdown_italic, \
                             html_figcaption, or plain"
                        ),
                    });
                }
            };
        }

        // Social
        if let Some(val) = first_of(&["TWITTER_API_KEY", "NEWSROOM_SOCIAL__API_KEY"]) {
            self.social.api_key = Some(val);
        }
        if let Some(val) = first_of(&["TWITTER_API_SECRET", "NEWSROOM_SOCIAL__API_SECRET"]) {
            self.social.api_secret = Some(val);
        }
        if let Some(val) = first_of(&["TWITTER_ACCESS_TOKEN", "NEWSROOM_SOCIAL__ACCESS_TOKEN"]) {
            self.social.access_token = Some(val);
        }
        if let Some(val) = first_of(&["TWITTER_ACCESS_SECRET", "NEWSROOM_SOCIAL__ACCESS_SECRET"]) {
            self.social.access_secret = Some(val);
        }
        if self.social.api_key.is_some() && self.social.access_token.is_some() {
            self.social.enabled = true;
        }

        // Storage
        if let Some(val) = first_of(&["NEWSROOM_STORAGE__DATA_DIR"]) {
            self.storage.data_dir = val.into();
        }
        if let Some(val) = first_of(&["NEWSROOM_STORAGE__PUBLIC_DIR"]) {
            self.storage.public_dir = val.into();
        }

        // Pipeline
        if let Some(val) = first_of(&["NEWSROOM_PIPELINE__WORKERS"]) {
            self.pipeline.workers = parse_env_usize("NEWSROOM_PIPELINE__WORKERS", &val)?;
        }
        if let Some(val) = first_of(&["NEWSROOM_PIPELINE__STAGE_TIMEOUT_SECS"]) {
            self.pipeline.stage_timeout_secs =
                parse_env_u64("NEWSROOM_PIPELINE__STAGE_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = first_of(&["NEWSROOM_PIPELINE__RECORD_BUDGET_SECS"]) {
            self.pipeline.record_budget_secs =
                parse_env_u64("NEWSROOM_PIPELINE__RECORD_BUDGET_SECS", &val)?;
        }

        Ok(())
    }
}

fn first_of(names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| env::var(n).ok())
}

fn parse_env_u32(name: &str, val: &str) -> Result<u32, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("'{val}' is not a valid integer"),
    })
}

fn parse_env_u64(name: &str, val: &str) -> Result<u64, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("'{val}' is not a valid integer"),
    })
}

fn parse_env_usize(name: &str, val: &str) -> Result<usize, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("'{val}' is not a valid integer"),
    })
}

fn parse_env_f32(name: &str, val: &str) -> Result<f32, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("'{val}' is not a valid number"),
    })
}
