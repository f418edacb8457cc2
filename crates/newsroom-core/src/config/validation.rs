//! Configuration validation logic.

use super::Config;
use crate::error::ConfigError;

impl Config {
    /// Validate the configuration, returning all errors found (not just the first).
    ///
    /// Credentials are only required for features that are enabled, so a
    /// pipeline run with TTS and social posting disabled needs nothing
    /// beyond the LLM key.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        match &self.llm.api_key {
            Some(key) if !key.is_empty() => {}
            _ => errors.push(ConfigError::MissingField {
                field: "llm.api_key".to_string(),
            }),
        }

        if self.dedup.threshold_duplicate < self.dedup.threshold_near_duplicate {
            errors.push(ConfigError::InvalidValue {
                field: "dedup.threshold_duplicate".to_string(),
                message: "must be >= dedup.threshold_near_duplicate".to_string(),
            });
        }
        for (field, value) in [
            ("dedup.threshold_duplicate", self.dedup.threshold_duplicate),
            (
                "dedup.threshold_near_duplicate",
                self.dedup.threshold_near_duplicate,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }

        if self.tts.enabled {
            match &self.tts.api_key {
                Some(key) if !key.is_empty() => {}
                _ => errors.push(ConfigError::MissingField {
                    field: "tts.api_key (required when tts.enabled)".to_string(),
                }),
            }
        }

        if self.social.enabled {
            for (field, value) in [
                ("social.api_key", &self.social.api_key),
                ("social.api_secret", &self.social.api_secret),
                ("social.access_token", &self.social.access_token),
                ("social.access_secret", &self.social.access_secret),
            ] {
                match value {
                    Some(v) if !v.is_empty() => {}
                    _ => errors.push(ConfigError::MissingField {
                        field: format!("{field} (required when social.enabled)"),
                    }),
                }
            }
        }

        if self.pipeline.workers == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "pipeline.workers".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
