//! Social distribution: tweet a published article with its image.
//!
//! The platform treats re-posting identical text as an error (the
//! long-standing duplicate-status code 187); the poster maps that to a
//! non-fatal success so republishing runs stay idempotent.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::SocialConfig;
use crate::error::SocialError;

/// Duplicate-status error code.
const DUPLICATE_STATUS_CODE: i64 = 187;

/// Outcome of one post attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    /// Whether a new post was created.
    pub posted: bool,
    /// Whether the platform reported the content as a duplicate.
    pub duplicate: bool,
    /// ID of the created post, when one was created.
    pub post_id: Option<String>,
}

/// Trait abstracting the social platform.
#[async_trait::async_trait]
pub trait SocialClient: Send + Sync {
    /// Post an article announcement: title, canonical URL, optional image.
    async fn post_article(
        &self,
        title: &str,
        url: &str,
        image_url: Option<&str>,
    ) -> Result<PostOutcome, SocialError>;
}

/// HTTP client for the X API v2 (user-context token).
#[derive(Debug)]
pub struct HttpSocialClient {
    client: reqwest::Client,
    base_url: String,
    upload_url: String,
    access_token: String,
}

impl HttpSocialClient {
    /// Build a client from configuration. Fails when the access token is
    /// absent.
    pub fn from_config(config: &SocialConfig) -> Result<Self, SocialError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SocialError::NotConfigured {
                message: "social.access_token is not set".to_string(),
            })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: "https://api.x.com".to_string(),
            upload_url: "https://upload.twitter.com".to_string(),
            access_token,
        })
    }

    #[cfg(test)]
    fn with_endpoints(base_url: String, upload_url: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            upload_url,
            access_token,
        }
    }

    /// Download the article image and upload it, returning the media ID.
    async fn upload_image(&self, image_url: &str) -> Result<String, SocialError> {
        let image = self.client.get(image_url).send().await?;
        if !image.status().is_success() {
            return Err(SocialError::MediaUpload {
                message: format!("image fetch failed with HTTP {}", image.status().as_u16()),
            });
        }
        let bytes = image.bytes().await?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let response = self
            .client
            .post(format!("{}/1.1/media/upload.json", self.upload_url))
            .bearer_auth(&self.access_token)
            .form(&[("media_data", encoded.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SocialError::MediaUpload {
                message: format!("upload failed with HTTP {status}: {message}"),
            });
        }

        let body: MediaUploadResponse = response.json().await?;
        body.media_id_string.ok_or_else(|| SocialError::MediaUpload {
            message: "upload response carried no media ID".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SocialClient for HttpSocialClient {
    async fn post_article(
        &self,
        title: &str,
        url: &str,
        image_url: Option<&str>,
    ) -> Result<PostOutcome, SocialError> {
        let media_id = match image_url {
            Some(image) => match self.upload_image(image).await {
                Ok(id) => Some(id),
                Err(e) => {
                    // The post is still worth making without the image.
                    tracing::warn!(error = %e, "image upload failed; posting text only");
                    None
                }
            },
            None => None,
        };

        let text = format!("{title}\n\n{url}");
        let request = TweetRequest {
            text: &text,
            media: media_id.as_ref().map(|id| TweetMedia {
                media_ids: vec![id.clone()],
            }),
        };

        let response = self
            .client
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            let parsed: TweetResponse = serde_json::from_str(&body).unwrap_or_default();
            let post_id = parsed.data.and_then(|d| d.id);
            tracing::info!(post_id = post_id.as_deref().unwrap_or("unknown"), "article posted");
            return Ok(PostOutcome {
                posted: true,
                duplicate: false,
                post_id,
            });
        }

        if is_duplicate_error(&body) {
            tracing::warn!("platform reported duplicate content; treating as success");
            return Ok(PostOutcome {
                posted: false,
                duplicate: true,
                post_id: None,
            });
        }

        Err(SocialError::Api {
            status,
            message: body,
        })
    }
}

/// Whether an error body reports the duplicate-status condition, either
/// via the classic numeric code or the newer detail text.
fn is_duplicate_error(body: &str) -> bool {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(errors) = value["errors"].as_array() {
            if errors
                .iter()
                .any(|e| e["code"].as_i64() == Some(DUPLICATE_STATUS_CODE))
            {
                return true;
            }
        }
        if let Some(detail) = value["detail"].as_str() {
            if detail.to_lowercase().contains("duplicate") {
                return true;
            }
        }
    }
    false
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Deserialize, Default)]
struct TweetResponse {
    #[serde(default)]
    data: Option<TweetData>,
}

#[derive(Deserialize)]
struct TweetData {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    #[serde(default)]
    media_id_string: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_pair() -> (MockServer, MockServer, HttpSocialClient) {
        let api = MockServer::start().await;
        let upload = MockServer::start().await;
        let client =
            HttpSocialClient::with_endpoints(api.uri(), upload.uri(), "token".to_string());
        (api, upload, client)
    }

    #[tokio::test]
    async fn post_with_image_uploads_then_tweets() {
        let (api, upload, client) = mock_pair().await;

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegbytes".to_vec()))
            .mount(&upload)
            .await;
        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"media_id_string": "M123"}),
            ))
            .mount(&upload)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_string_contains("M123"))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                serde_json::json!({"data": {"id": "T999"}}),
            ))
            .mount(&api)
            .await;

        let outcome = client
            .post_article(
                "Big News",
                "https://site.example.com/articles/big-news.html",
                Some(&format!("{}/image.jpg", upload.uri())),
            )
            .await
            .unwrap();

        assert!(outcome.posted);
        assert_eq!(outcome.post_id.as_deref(), Some("T999"));
    }

    #[tokio::test]
    async fn duplicate_code_187_is_non_fatal() {
        let (api, _upload, client) = mock_pair().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(
                serde_json::json!({"errors": [{"code": 187, "message": "Status is a duplicate."}]}),
            ))
            .mount(&api)
            .await;

        let outcome = client
            .post_article("Big News", "https://x.example/a.html", None)
            .await
            .unwrap();

        assert!(!outcome.posted);
        assert!(outcome.duplicate);
    }

    #[tokio::test]
    async fn duplicate_detail_text_is_non_fatal() {
        let (api, _upload, client) = mock_pair().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(
                serde_json::json!({"detail": "You are not allowed to create a Tweet with duplicate content."}),
            ))
            .mount(&api)
            .await;

        let outcome = client
            .post_article("Big News", "https://x.example/a.html", None)
            .await
            .unwrap();

        assert!(outcome.duplicate);
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let (api, _upload, client) = mock_pair().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&api)
            .await;

        let err = client
            .post_article("Big News", "https://x.example/a.html", None)
            .await
            .unwrap_err();

        match err {
            SocialError::Api { status, .. } => assert_eq!(status, 401),
            other => panic!("expected Api, got: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_image_upload_still_posts_text() {
        let (api, upload, client) = mock_pair().await;

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&upload)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(
                serde_json::json!({"data": {"id": "T1"}}),
            ))
            .mount(&api)
            .await;

        let outcome = client
            .post_article(
                "Big News",
                "https://x.example/a.html",
                Some(&format!("{}/image.jpg", upload.uri())),
            )
            .await
            .unwrap();

        assert!(outcome.posted);
    }

    #[test]
    fn missing_token_is_not_configured() {
        let err = HttpSocialClient::from_config(&SocialConfig::default()).unwrap_err();
        assert!(matches!(err, SocialError::NotConfigured { .. }));
    }
}
