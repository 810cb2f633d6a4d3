//! Core data models for the improvement loop

use serde::{Deserialize, Serialize};

use crate::core::errors::{ImproverError, Result};

/// Score used when the service gives no parseable similarity
pub const DEFAULT_SIMILARITY: f64 = 0.5;

/// Suggestions used when the service gives no `SUGGESTIONS:` line
pub const DEFAULT_SUGGESTIONS: &str = "No specific suggestions available.";

/// Outcome of one loop iteration. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Source-language text the run started from
    pub original_text: String,
    /// Target-language text assessed in this iteration
    pub target_text: String,
    /// `target_text` translated back to the source language
    pub back_translated_text: String,
    /// Similarity between `original_text` and `back_translated_text`
    pub similarity_score: f64,
    /// Free-text guidance for the next rewrite
    pub suggestions: String,
    /// 1-based iteration index
    pub iteration: usize,
}

/// Per-run stopping rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Upper bound on iterations, at least 1
    pub max_iterations: usize,
    /// Stop as soon as a score reaches this value
    pub similarity_threshold: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            similarity_threshold: 0.9,
        }
    }
}

impl RunConfig {
    /// Create a run configuration; see [`RunConfig::validate`]
    pub fn new(max_iterations: usize, similarity_threshold: f64) -> Self {
        Self {
            max_iterations,
            similarity_threshold,
        }
    }

    /// Validate run parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ImproverError::ConfigError {
                message: "max_iterations must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ImproverError::ConfigError {
                message: format!(
                    "similarity_threshold must be within [0.0, 1.0], got {}",
                    self.similarity_threshold
                ),
            });
        }

        Ok(())
    }
}

/// Parsed answer of a similarity comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// Similarity score, nominally within [0.0, 1.0]
    pub score: f64,
    /// Guidance for the next rewrite
    pub suggestions: String,
}

impl Assessment {
    /// Create an assessment
    pub fn new(score: f64, suggestions: impl Into<String>) -> Self {
        Self {
            score,
            suggestions: suggestions.into(),
        }
    }
}

impl Default for Assessment {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY, DEFAULT_SUGGESTIONS)
    }
}

/// Translation request sent to the machine-translation API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// Language of `text`
    pub source_lang: String,
    /// Language to translate into
    pub target_lang: String,
}

impl TranslationRequest {
    /// Create a request
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// Chat message in the completions protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role, `user` for prompts
    #[serde(default)]
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Message authored by the user
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completions request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model name
    pub model: String,
    /// Conversation, a single user prompt here
    pub messages: Vec<ChatMessage>,
    /// Generation limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

/// Chat completions response body, reduced to what is read
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Generated alternatives
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// One generated alternative
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Content of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
