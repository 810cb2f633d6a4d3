//! Translation engine interface and its HTTP implementation

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::ImproverConfig;
use crate::core::errors::{ImproverError, Result};
use crate::core::models::TranslationRequest;

/// Bidirectional translator between the source and the target language
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Translate source-language text into the target language
    async fn to_target(&self, text: &str) -> Result<String>;

    /// Translate target-language text back into the source language
    async fn to_source(&self, text: &str) -> Result<String>;
}

/// Reject text that is empty after trimming
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ImproverError::InvalidInput {
            message: "text to translate must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Exponential backoff before retry `attempt` (1-based), saturating instead of overflowing
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Translation engine backed by a machine-translation HTTP API
#[derive(Debug, Clone)]
pub struct HttpTranslationEngine {
    client: reqwest::Client,
    config: Arc<ImproverConfig>,
}

impl HttpTranslationEngine {
    /// Create a new engine
    pub fn new(config: ImproverConfig) -> Result<Self> {
        config.validate()?;

        if config.translation_api_key.is_empty() {
            return Err(ImproverError::ConfigError {
                message: "TRANSLATION_API_KEY (or ARK_API_KEY) is required for translation"
                    .to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(ImproverConfig::from_env()?)
    }

    /// Translate a single request, retrying transient failures
    pub async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        validate_text(&request.text)?;

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retry attempt {} for translation", attempt);
                sleep(backoff_delay(self.config.retry_delay_ms, attempt)).await;
            }

            match self.send_request(request).await {
                Ok(translation) => {
                    if attempt > 0 {
                        info!("Successfully translated after {} retries", attempt);
                    }
                    return Ok(translation);
                }
                Err(e) => {
                    warn!(
                        "Translation {} -> {} failed: {}",
                        request.source_lang, request.target_lang, e
                    );
                    let permanent = matches!(
                        &e,
                        ImproverError::ApiError { status, .. }
                            if (400..500).contains(status) && *status != 429
                    );
                    last_error = Some(e);
                    if permanent {
                        break;
                    }
                }
            }
        }

        let err = last_error.unwrap_or_else(|| ImproverError::InternalError(
            "translation attempted zero times".to_string(),
        ));
        Err(ImproverError::Engine {
            message: err.to_string(),
        })
    }

    /// Send actual HTTP request
    async fn send_request(&self, request: &TranslationRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.translation_model,
            "input": [{
                "role": "user",
                "content": [{
                    "type": "input_text",
                    "text": request.text,
                    "translation_options": {
                        "source_language": request.source_lang,
                        "target_language": request.target_lang
                    }
                }]
            }]
        });

        let response = self
            .client
            .post(&self.config.translation_endpoint)
            .header("Authorization", format!("Bearer {}", self.config.translation_api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ImproverError::from_transport)?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImproverError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ImproverError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        let choices = if json["output"]["choices"].is_array() {
            &json["output"]["choices"]
        } else {
            &json["choices"]
        };

        let translation = choices
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ImproverError::InvalidResponseError {
                message: "No translation in response".to_string(),
            })?;

        Ok(translation.to_string())
    }
}

#[async_trait]
impl TranslationEngine for HttpTranslationEngine {
    async fn to_target(&self, text: &str) -> Result<String> {
        let request = TranslationRequest::new(
            text,
            self.config.source_lang.as_str(),
            self.config.target_lang.as_str(),
        );
        self.translate(&request).await
    }

    async fn to_source(&self, text: &str) -> Result<String> {
        let request = TranslationRequest::new(
            text,
            self.config.target_lang.as_str(),
            self.config.source_lang.as_str(),
        );
        self.translate(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> HttpTranslationEngine {
        HttpTranslationEngine::new(ImproverConfig {
            translation_api_key: "test_key".to_string(),
            translation_endpoint: server.uri(),
            retry_delay_ms: 1,
            ..Default::default()
        })
        .unwrap()
    }

    fn translated(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "output": {"choices": [{"message": {"content": text}}]}
        }))
    }

    #[test]
    fn test_engine_requires_api_key() {
        let result = HttpTranslationEngine::new(ImproverConfig::default());
        assert!(matches!(result, Err(ImproverError::ConfigError { .. })));
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 3), Duration::from_millis(400));
        assert_eq!(backoff_delay(1000, 70), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("hello").is_ok());
        assert!(validate_text("   \n").is_err());
    }

    #[tokio::test]
    async fn test_to_target_and_back() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test_key"))
            .and(body_partial_json(serde_json::json!({
                "input": [{"content": [{"translation_options": {
                    "source_language": "en", "target_language": "ru"
                }}]}]
            })))
            .respond_with(translated("Привет"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "input": [{"content": [{"translation_options": {
                    "source_language": "ru", "target_language": "en"
                }}]}]
            })))
            .respond_with(translated("Hello"))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        assert_eq!(engine.to_target("Hello").await.unwrap(), "Привет");
        assert_eq!(engine.to_source("Привет").await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(translated("unused"))
            .expect(0)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine.to_target("  ").await.unwrap_err();
        assert!(matches!(err, ImproverError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(translated("Привет"))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        assert_eq!(engine.to_target("Hello").await.unwrap(), "Привет");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let err = engine.to_target("Hello").await.unwrap_err();
        assert!(matches!(err, ImproverError::Engine { .. }));
        assert!(err.to_string().contains("401"));
    }
}
