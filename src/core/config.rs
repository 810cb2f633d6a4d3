//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::errors::{ImproverError, Result};

const DEFAULT_GIGACHAT_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1/chat/completions";
const DEFAULT_GIGACHAT_MODEL: &str = "GigaChat:latest";
const DEFAULT_TRANSLATION_ENDPOINT: &str = "https://ark.cn-beijing.volces.com/api/v3/responses";
const DEFAULT_TRANSLATION_MODEL: &str = "doubao-seed-translation-250915";

/// Upper bound on translation retries
pub const MAX_TRANSLATION_RETRIES: u32 = 10;

/// Configuration for the translation engine and the improvement service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImproverConfig {
    /// Bearer token for the improvement service; `None` selects degraded mode
    pub gigachat_token: Option<String>,
    /// Chat-completions endpoint
    pub gigachat_url: String,
    /// Model name sent with every completion request
    pub gigachat_model: String,
    /// Bearer key for the translation API
    pub translation_api_key: String,
    /// Translation API endpoint
    pub translation_endpoint: String,
    /// Translation model id
    pub translation_model: String,
    /// Language of the original text
    pub source_lang: String,
    /// Language the text is translated into
    pub target_lang: String,
    /// Translation retries after the first attempt
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff
    pub retry_delay_ms: u64,
    /// Per-request HTTP timeout for both services
    pub timeout_ms: u64,
}

impl Default for ImproverConfig {
    fn default() -> Self {
        Self {
            gigachat_token: None,
            gigachat_url: DEFAULT_GIGACHAT_URL.to_string(),
            gigachat_model: DEFAULT_GIGACHAT_MODEL.to_string(),
            translation_api_key: String::new(),
            translation_endpoint: DEFAULT_TRANSLATION_ENDPOINT.to_string(),
            translation_model: DEFAULT_TRANSLATION_MODEL.to_string(),
            source_lang: "en".to_string(),
            target_lang: "ru".to_string(),
            max_retries: 2,
            retry_delay_ms: 1000,
            timeout_ms: 30000,
        }
    }
}

/// Read an env var, treating blank values as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ImproverError::ConfigError {
            message: format!("{key}: {e}"),
        }),
        None => Ok(default),
    }
}

impl ImproverConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let gigachat_token = env_opt("GIGACHAT_TOKEN");
        if gigachat_token.is_none() {
            info!("GIGACHAT_TOKEN not set, improvement service will run in fallback mode");
        }

        let translation_api_key = env_opt("TRANSLATION_API_KEY")
            .or_else(|| env_opt("ARK_API_KEY"))
            .unwrap_or_default();

        Ok(Self {
            gigachat_token,
            gigachat_url: env_opt("GIGACHAT_API_URL").unwrap_or(defaults.gigachat_url),
            gigachat_model: env_opt("GIGACHAT_MODEL").unwrap_or(defaults.gigachat_model),
            translation_api_key,
            translation_endpoint: env_opt("TRANSLATION_ENDPOINT")
                .unwrap_or(defaults.translation_endpoint),
            translation_model: env_opt("TRANSLATION_MODEL").unwrap_or(defaults.translation_model),
            source_lang: env_opt("SOURCE_LANG").unwrap_or(defaults.source_lang),
            target_lang: env_opt("TARGET_LANG").unwrap_or(defaults.target_lang),
            max_retries: env_parse("TRANSLATION_MAX_RETRIES", defaults.max_retries)?,
            retry_delay_ms: env_parse("RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            timeout_ms: env_parse("IMPROVER_TIMEOUT_MS", defaults.timeout_ms)?,
        })
    }

    /// Override the improvement-service token when one is given explicitly
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.gigachat_token = Some(token);
        }
        self
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ImproverError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.translation_endpoint.is_empty() {
            return Err(ImproverError::ConfigError {
                message: "Translation endpoint is required".to_string(),
            });
        }

        if self.gigachat_url.is_empty() {
            return Err(ImproverError::ConfigError {
                message: "Improvement service URL is required".to_string(),
            });
        }

        if self.source_lang.is_empty() || self.target_lang.is_empty() {
            return Err(ImproverError::ConfigError {
                message: "Source and target languages are required".to_string(),
            });
        }

        if self.timeout_ms == 0 {
            return Err(ImproverError::ConfigError {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.max_retries > MAX_TRANSLATION_RETRIES {
            return Err(ImproverError::ConfigError {
                message: format!(
                    "max_retries must be at most {}, got {}",
                    MAX_TRANSLATION_RETRIES, self.max_retries
                ),
            });
        }

        if self.translation_api_key.is_empty() {
            warn!("No translation API key configured");
        }

        Ok(())
    }

    /// Whether the improvement service can be called for real
    pub fn has_token(&self) -> bool {
        self.gigachat_token.is_some()
    }
}
