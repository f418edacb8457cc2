//! The structured-JSON LLM gateway.
//!
//! Single entry point for every analysis and writing stage. Layers on top
//! of an [`LlmProvider`]:
//!
//! - model profile selection (temperature per call class),
//! - retry with exponential backoff for transport faults, timeouts,
//!   HTTP 5xx and 429 (other 4xx are not retried),
//! - markdown fence stripping and a one-shot fenced-block re-extraction
//!   when the raw content fails to parse,
//! - expected-key validation (extra keys are tolerated).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use super::{GenerationParams, LlmProvider, ModelProfile};
use crate::error::LlmError;

/// Maximum single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry and pacing knobs for the gateway.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per call (first try included).
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Gateway for structured-JSON LLM calls.
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl LlmGateway {
    /// Create a gateway over the given provider.
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Call the LLM and return a validated JSON object.
    ///
    /// `expect_keys` lists the top-level keys the response must contain;
    /// extra keys are tolerated. Parse failures try one fenced-block
    /// re-extraction before giving up.
    pub async fn call(
        &self,
        profile: ModelProfile,
        system_prompt: &str,
        user_payload: &str,
        expect_keys: &[&str],
    ) -> Result<Value, LlmError> {
        let params = GenerationParams {
            temperature: profile.temperature(),
            ..Default::default()
        };

        let mut last_err = None;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "LLM retry");
                tokio::time::sleep(delay).await;
            }

            match self
                .provider
                .complete(system_prompt, user_payload, &params)
                .await
            {
                Ok(resp) => return parse_structured(&resp.text, expect_keys),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempt, error = %e, "retryable LLM failure");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(LlmError::Timeout { seconds: 0 }))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.retry.base_delay.saturating_mul(1 << attempt.min(8));
        let capped = exp.min(MAX_BACKOFF);
        // Up to 20% jitter so parallel workers don't retry in lockstep.
        let jitter = rand::thread_rng().gen_range(0.0..0.2);
        capped.mul_f64(1.0 + jitter)
    }
}

/// Parse LLM text content into a JSON object with the expected keys.
pub fn parse_structured(text: &str, expect_keys: &[&str]) -> Result<Value, LlmError> {
    let stripped = strip_code_fences(text);

    let value = match serde_json::from_str::<Value>(&stripped) {
        Ok(v) => v,
        Err(first_err) => {
            // Fallback: the model may have wrapped the object in prose.
            // Re-extract the first fenced JSON block and parse once more.
            match extract_fenced_json(text) {
                Some(block) => {
                    serde_json::from_str::<Value>(&block).map_err(|e| LlmError::BadJson {
                        message: format!("fallback extraction failed: {e} (initial: {first_err})"),
                    })?
                }
                None => {
                    return Err(LlmError::BadJson {
                        message: first_err.to_string(),
                    })
                }
            }
        }
    };

    let Some(object) = value.as_object() else {
        return Err(LlmError::BadJson {
            message: "response is not a JSON object".to_string(),
        });
    };

    let missing: Vec<String> = expect_keys
        .iter()
        .filter(|k| !object.contains_key(**k))
        .map(|k| (*k).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LlmError::SchemaIncomplete { missing });
    }

    Ok(value)
}

/// Strip a surrounding ```json ... ``` (or plain ```) fence if present.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    let inner = rest.strip_suffix("```").unwrap_or(rest);
    inner.trim().to_string()
}

/// Find the first fenced ```json { ... } ``` block anywhere in the text.
fn extract_fenced_json(text: &str) -> Option<String> {
    let start_fence = text.find("```json").map(|i| i + "```json".len())?;
    let rest = &text[start_fence..];
    let end = rest.find("```")?;
    let block = rest[..end].trim();
    block.starts_with('{').then(|| block.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::llm::LlmResponse;

    /// Scripted provider that returns each canned result once, in order.
    struct ScriptedProvider {
        responses: Vec<Result<String, LlmError>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl crate::llm::LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match &self.responses[idx.min(self.responses.len() - 1)] {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    model: "scripted".to_string(),
                }),
                Err(LlmError::HttpStatus { status, message }) => Err(LlmError::HttpStatus {
                    status: *status,
                    message: message.clone(),
                }),
                Err(LlmError::Timeout { seconds }) => Err(LlmError::Timeout { seconds: *seconds }),
                Err(_) => Err(LlmError::BadJson {
                    message: "scripted".to_string(),
                }),
            }
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn gateway(provider: ScriptedProvider) -> LlmGateway {
        LlmGateway::new(Arc::new(provider), fast_retry())
    }

    #[tokio::test]
    async fn plain_json_passes_schema_check() {
        let gw = gateway(ScriptedProvider::new(vec![Ok(
            r#"{"verdict": "ok", "extra": 1}"#.to_string()
        )]));

        let value = gw
            .call(ModelProfile::DeterministicJson, "s", "u", &["verdict"])
            .await
            .expect("call");

        assert_eq!(value["verdict"], "ok");
    }

    #[tokio::test]
    async fn fenced_json_is_stripped() {
        let gw = gateway(ScriptedProvider::new(vec![Ok(
            "```json\n{\"score\": 0.5}\n```".to_string()
        )]));

        let value = gw
            .call(ModelProfile::Analytical, "s", "u", &["score"])
            .await
            .expect("call");

        assert_eq!(value["score"], 0.5);
    }

    #[tokio::test]
    async fn prose_wrapped_json_recovered_by_fallback_extraction() {
        let gw = gateway(ScriptedProvider::new(vec![Ok(
            "Here is the assessment:\n```json\n{\"level\": \"High\"}\n```\nHope that helps."
                .to_string(),
        )]));

        let value = gw
            .call(ModelProfile::Analytical, "s", "u", &["level"])
            .await
            .expect("call");

        assert_eq!(value["level"], "High");
    }

    #[tokio::test]
    async fn missing_key_is_schema_incomplete() {
        let gw = gateway(ScriptedProvider::new(vec![Ok(
            r#"{"other": 1}"#.to_string()
        )]));

        let err = gw
            .call(ModelProfile::DeterministicJson, "s", "u", &["verdict"])
            .await
            .unwrap_err();

        match err {
            LlmError::SchemaIncomplete { missing } => assert_eq!(missing, vec!["verdict"]),
            other => panic!("expected SchemaIncomplete, got: {other}"),
        }
    }

    #[tokio::test]
    async fn retries_on_500_then_succeeds() {
        let gw = gateway(ScriptedProvider::new(vec![
            Err(LlmError::HttpStatus {
                status: 500,
                message: "boom".to_string(),
            }),
            Err(LlmError::HttpStatus {
                status: 429,
                message: "slow down".to_string(),
            }),
            Ok(r#"{"ok": true}"#.to_string()),
        ]));

        let value = gw
            .call(ModelProfile::DeterministicJson, "s", "u", &["ok"])
            .await
            .expect("call");

        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn does_not_retry_on_401() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LlmError::HttpStatus {
                status: 401,
                message: "bad key".to_string(),
            }),
            Ok(r#"{"ok": true}"#.to_string()),
        ]));
        let gw = LlmGateway::new(Arc::clone(&provider) as Arc<dyn LlmProvider>, fast_retry());

        let err = gw
            .call(ModelProfile::DeterministicJson, "s", "u", &["ok"])
            .await
            .unwrap_err();

        match err {
            LlmError::HttpStatus { status, .. } => assert_eq!(status, 401),
            other => panic!("expected HttpStatus, got: {other}"),
        }
        // Exactly one attempt was made.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let gw = gateway(ScriptedProvider::new(vec![Err(LlmError::HttpStatus {
            status: 503,
            message: "down".to_string(),
        })]));

        let err = gw
            .call(ModelProfile::DeterministicJson, "s", "u", &["ok"])
            .await
            .unwrap_err();

        match err {
            LlmError::HttpStatus { status, .. } => assert_eq!(status, 503),
            other => panic!("expected HttpStatus, got: {other}"),
        }
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\r\n{\"a\":1}\r\n```  "), "{\"a\":1}");
    }

    #[test]
    fn extract_fenced_json_requires_object() {
        assert_eq!(
            extract_fenced_json("x ```json\n{\"a\":1}\n``` y"),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(extract_fenced_json("```json\n[1,2]\n```"), None);
        assert_eq!(extract_fenced_json("no fences"), None);
    }
}
