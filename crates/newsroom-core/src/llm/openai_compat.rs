//! OpenAI-compatible chat-completions provider.
//!
//! Works with any endpoint speaking the chat completions format,
//! including DeepSeek and local OpenAI-compatible servers. Requests ask
//! for `response_format: {"type": "json_object"}` when JSON mode is on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{GenerationParams, LlmProvider, LlmResponse};
use crate::error::LlmError;

/// An LLM provider using the OpenAI chat completions API format.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::ConfigMissing {
                message: "llm.api_key is not set".to_string(),
            });
        }

        tracing::debug!(
            model = %self.model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            json_mode = params.json_mode,
            "LLM request",
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            response_format: params.json_mode.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    LlmError::Transport { source }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus { status, message });
        }

        let body: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::BadJson {
                message: format!("failed to parse completion envelope: {e}"),
            })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(chars = text.len(), "LLM response");

        Ok(LlmResponse {
            text,
            model: body.model,
        })
    }
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            uri.to_string(),
            "test-key".into(),
            "deepseek-chat".into(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn complete_success() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "choices": [{"message": {"content": "{\"ok\": true}"}}],
            "model": "deepseek-chat"
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(
                serde_json::json!({"response_format": {"type": "json_object"}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let resp = provider(&server.uri())
            .complete("system", "hello", &GenerationParams::default())
            .await
            .expect("complete");

        assert_eq!(resp.text, "{\"ok\": true}");
        assert_eq!(resp.model, "deepseek-chat");
    }

    #[tokio::test]
    async fn json_mode_off_omits_response_format() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "choices": [{"message": {"content": "plain text"}}],
            "model": "deepseek-chat"
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let params = GenerationParams {
            json_mode: false,
            ..Default::default()
        };
        let resp = provider(&server.uri())
            .complete("system", "hello", &params)
            .await
            .expect("complete");

        assert_eq!(resp.text, "plain text");
    }

    #[tokio::test]
    async fn error_status_maps_to_http_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .complete("system", "hello", &GenerationParams::default())
            .await
            .unwrap_err();

        match err {
            LlmError::HttpStatus { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("internal error"));
            }
            other => panic!("expected HttpStatus, got: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_api_key_is_config_missing() {
        // No server needed: the key check runs before any request.
        let provider = OpenAiCompatProvider::new(
            "http://127.0.0.1:1".into(),
            String::new(),
            "model".into(),
            Duration::from_secs(1),
        );

        let err = provider
            .complete("system", "hello", &GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ConfigMissing { .. }));
    }

    #[tokio::test]
    async fn missing_choices_yields_empty_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"model": "m"})),
            )
            .mount(&server)
            .await;

        let resp = provider(&server.uri())
            .complete("system", "hello", &GenerationParams::default())
            .await
            .expect("complete");

        assert!(resp.text.is_empty());
    }
}
