//! Improvement service: live chat-completions client and offline fallback

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::config::ImproverConfig;
use crate::core::errors::{ImproverError, Result};
use crate::core::models::{ChatMessage, ChatRequest, ChatResponse};

/// Marker preceding the target-language text in improvement prompts
pub const CURRENT_RUSSIAN_MARKER: &str = "CURRENT RUSSIAN:";

/// Marker following the target-language text in improvement prompts
pub const SUGGESTIONS_MARKER: &str = "IMPROVEMENT SUGGESTIONS:";

const FALLBACK_ASSESSMENT: &str =
    "SIMILARITY: 0.7\nSUGGESTIONS: Consider improving word choice and sentence structure.";
const FALLBACK_GREETING: &str = "Привет, как дела?";
const FALLBACK_APOLOGY: &str = "I'm sorry, I cannot process this request at the moment.";

/// Text generator answering a prompt
#[async_trait]
pub trait ImprovementService: Send + Sync {
    /// Answer `prompt`, generating at most `max_tokens` tokens
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Deterministic stand-in used without a live service
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    /// Answer a prompt from its shape alone
    pub fn respond(&self, prompt: &str) -> String {
        let lower = prompt.to_lowercase();

        if lower.contains("similarity score") {
            return FALLBACK_ASSESSMENT.to_string();
        }

        if let Some(current) = extract_current_text(prompt) {
            return current;
        }

        if lower.contains("improve") && lower.contains("russian") {
            return FALLBACK_GREETING.to_string();
        }

        FALLBACK_APOLOGY.to_string()
    }
}

/// Text between `CURRENT RUSSIAN:` and `IMPROVEMENT SUGGESTIONS:` (or the end), unquoted.
///
/// The span may cover several lines; one pair of surrounding quotes is removed.
fn extract_current_text(prompt: &str) -> Option<String> {
    let (_, rest) = prompt.split_once(CURRENT_RUSSIAN_MARKER)?;
    let span = rest
        .split_once(SUGGESTIONS_MARKER)
        .map_or(rest, |(current, _)| current)
        .trim();
    let unquoted = span
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(span);
    Some(unquoted.trim().to_string())
}

#[async_trait]
impl ImprovementService for FallbackResponder {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        Ok(self.respond(prompt))
    }
}

/// GigaChat chat-completions client. Failures are returned, never retried.
#[derive(Debug, Clone)]
pub struct GigaChatClient {
    client: reqwest::Client,
    url: String,
    model: String,
    token: String,
}

impl GigaChatClient {
    /// Create a client from the service settings in `config`
    pub fn new(config: &ImproverConfig, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.gigachat_url.clone(),
            model: config.gigachat_model.clone(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ImprovementService for GigaChatClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ImproverError::from_transport)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImproverError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ImproverError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        let content = parsed
            .first_content()
            .ok_or_else(|| ImproverError::InvalidResponseError {
                message: "No choices in response".to_string(),
            })?;

        debug!("GigaChat returned {} chars", content.len());
        Ok(content.trim().to_string())
    }
}

/// Improvement service with the live/degraded choice fixed at construction
#[derive(Debug, Clone)]
pub enum ImprovementBackend {
    /// Token present: call the service, answer failures with the fallback
    Live(GigaChatClient),
    /// No token: always answer with the fallback
    Degraded(FallbackResponder),
}

impl ImprovementBackend {
    /// Live when `config` carries a token, degraded otherwise
    pub fn new(config: &ImproverConfig) -> Result<Self> {
        match &config.gigachat_token {
            Some(token) => {
                info!("Using GigaChat at {} for translation improvement", config.gigachat_url);
                Ok(Self::Live(GigaChatClient::new(config, token.clone())?))
            }
            None => {
                info!("No GigaChat token found, using fallback mode");
                Ok(Self::Degraded(FallbackResponder))
            }
        }
    }

    /// Whether a real service is behind this backend
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

#[async_trait]
impl ImprovementService for ImprovementBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        match self {
            Self::Live(client) => match client.complete(prompt, max_tokens).await {
                Ok(content) => Ok(content),
                Err(e) => {
                    warn!("GigaChat call failed, using fallback response: {}", e);
                    Ok(FallbackResponder.respond(prompt))
                }
            },
            Self::Degraded(responder) => Ok(responder.respond(prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn live_config(server: &MockServer) -> ImproverConfig {
        ImproverConfig {
            gigachat_token: Some("giga-token".to_string()),
            gigachat_url: server.uri(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_similarity() {
        let answer = FallbackResponder.respond("Please give a Similarity Score for these texts");
        assert_eq!(answer, FALLBACK_ASSESSMENT);
    }

    #[test]
    fn test_fallback_echoes_current_text() {
        assert_eq!(FallbackResponder.respond("CURRENT RUSSIAN: \"Привет\""), "Привет");

        let prompt = "Improve this Russian translation:\n    ORIGINAL ENGLISH: \"Hi\"\n    CURRENT RUSSIAN: \"Здравствуй\"\n    IMPROVEMENT SUGGESTIONS: \"none\"";
        assert_eq!(FallbackResponder.respond(prompt), "Здравствуй");
    }

    #[test]
    fn test_fallback_echoes_multiline_text() {
        let current = "Первая строка.\nВторая строка.\n\"Цитата\" третья.";
        let prompt = format!(
            "Improve this Russian translation:\n\nORIGINAL ENGLISH: \"Hi\"\n{CURRENT_RUSSIAN_MARKER} \"{current}\"\n{SUGGESTIONS_MARKER} \"be closer\"\n\nReturn only the improved Russian text."
        );
        assert_eq!(FallbackResponder.respond(&prompt), current);

        let quoted = "\"Привет\", сказал он.\nПока.";
        let prompt = format!("{CURRENT_RUSSIAN_MARKER} \"{quoted}\"");
        assert_eq!(FallbackResponder.respond(&prompt), quoted);
    }

    #[test]
    fn test_fallback_greeting_and_apology() {
        assert_eq!(
            FallbackResponder.respond("Improve the Russian text please"),
            FALLBACK_GREETING
        );
        assert_eq!(FallbackResponder.respond("What is the weather?"), FALLBACK_APOLOGY);
    }

    #[test]
    fn test_backend_mode_selection() {
        let degraded = ImprovementBackend::new(&ImproverConfig::default()).unwrap();
        assert!(!degraded.is_live());

        let live = ImprovementBackend::new(&ImproverConfig {
            gigachat_token: Some("t".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(live.is_live());
    }

    #[tokio::test]
    async fn test_gigachat_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer giga-token"))
            .and(body_json(serde_json::json!({
                "model": "GigaChat:latest",
                "messages": [{"role": "user", "content": "hello"}],
                "max_tokens": 200,
                "temperature": 0.3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  Привет  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GigaChatClient::new(&live_config(&server), "giga-token").unwrap();
        assert_eq!(client.complete("hello", 200).await.unwrap(), "Привет");
    }

    #[tokio::test]
    async fn test_gigachat_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = GigaChatClient::new(&live_config(&server), "giga-token").unwrap();

        let err = client.complete("hello", 10).await.unwrap_err();
        assert!(matches!(err, ImproverError::ApiError { status: 503, .. }));

        let err = client.complete("hello", 10).await.unwrap_err();
        assert!(matches!(err, ImproverError::InvalidResponseError { .. }));
    }

    #[tokio::test]
    async fn test_live_backend_falls_back_on_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let backend = ImprovementBackend::new(&live_config(&server)).unwrap();
        let answer = backend
            .complete("Give a similarity score", 500)
            .await
            .unwrap();
        assert_eq!(answer, FALLBACK_ASSESSMENT);
    }
}
