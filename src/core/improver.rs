//! Iterative back-translation improvement loop

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::engine::{validate_text, TranslationEngine};
use crate::core::errors::{ImproverError, Result};
use crate::core::models::{
    Assessment, IterationResult, RunConfig, DEFAULT_SIMILARITY, DEFAULT_SUGGESTIONS,
};
use crate::core::service::{ImprovementService, CURRENT_RUSSIAN_MARKER, SUGGESTIONS_MARKER};

const COMPARE_MAX_TOKENS: u32 = 500;
const IMPROVE_MAX_TOKENS: u32 = 200;

const SIMILARITY_PREFIX: &str = "SIMILARITY:";
const SUGGESTIONS_PREFIX: &str = "SUGGESTIONS:";

/// Decides which target-language text moves on to the next iteration
pub trait Reviewer: Send + Sync {
    /// Return the text to continue with, given the suggested rewrite and the current text
    fn review(&self, suggested: &str, current: &str) -> String;

    /// Whether iteration `next` should run. Returning `false` ends the run early.
    fn proceed(&self, _next: usize) -> bool {
        true
    }
}

/// Always takes the suggested rewrite
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

impl Reviewer for AutoAccept {
    fn review(&self, suggested: &str, _current: &str) -> String {
        suggested.to_string()
    }
}

impl<F> Reviewer for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn review(&self, suggested: &str, current: &str) -> String {
        self(suggested, current)
    }
}

/// Parse a `SIMILARITY:` / `SUGGESTIONS:` answer, falling back to neutral defaults.
///
/// Only the first line carrying each prefix is considered. A score that does
/// not parse as a finite number yields [`DEFAULT_SIMILARITY`].
pub fn parse_assessment(response: &str) -> Assessment {
    let score = response
        .lines()
        .find_map(|line| line.strip_prefix(SIMILARITY_PREFIX))
        .and_then(|rest| rest.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .unwrap_or(DEFAULT_SIMILARITY);

    let suggestions = response
        .lines()
        .find_map(|line| line.strip_prefix(SUGGESTIONS_PREFIX))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SUGGESTIONS.to_string());

    Assessment::new(score, suggestions)
}

/// Highest-scoring result, earliest first on ties
pub fn best_result(results: &[IterationResult]) -> Option<&IterationResult> {
    results.iter().fold(None, |best, r| match best {
        Some(b) if b.similarity_score >= r.similarity_score => Some(b),
        _ => Some(r),
    })
}

fn comparison_prompt(original: &str, back_translated: &str) -> String {
    format!(
        r#"You are a translation quality assessment expert. Compare these two English texts:

ORIGINAL: "{original}"
BACK-TRANSLATED: "{back_translated}"

Please provide:
1. A similarity score from 0.0 to 1.0 (where 1.0 means identical meaning)
2. Specific suggestions for improving the Russian translation to better preserve the original meaning

Format your response as:
SIMILARITY: [score]
SUGGESTIONS: [your suggestions]"#
    )
}

fn improvement_prompt(original: &str, current_target: &str, suggestions: &str) -> String {
    format!(
        r#"You are a professional translator. Improve this Russian translation based on the suggestions:

ORIGINAL ENGLISH: "{original}"
{CURRENT_RUSSIAN_MARKER} "{current_target}"
{SUGGESTIONS_MARKER} "{suggestions}"

Provide an improved Russian translation that better preserves the original meaning.
Return only the improved Russian text, nothing else."#
    )
}

/// Drives a translation toward one whose back-translation matches the original
pub struct ImprovementLoop {
    engine: Arc<dyn TranslationEngine>,
    service: Arc<dyn ImprovementService>,
    reviewer: Box<dyn Reviewer>,
}

impl ImprovementLoop {
    /// Create a loop that accepts every suggested rewrite
    pub fn new(engine: Arc<dyn TranslationEngine>, service: Arc<dyn ImprovementService>) -> Self {
        Self {
            engine,
            service,
            reviewer: Box::new(AutoAccept),
        }
    }

    /// Replace the reviewer applied to each suggested rewrite
    pub fn with_reviewer(mut self, reviewer: impl Reviewer + 'static) -> Self {
        self.reviewer = Box::new(reviewer);
        self
    }

    /// Run the loop until the threshold is met, the iterations run out or the
    /// reviewer declines to continue.
    ///
    /// Only a failure of the initial translation is returned as an error;
    /// every later failure degrades to a fallback value and the run goes on.
    pub async fn run(&self, original_text: &str, config: &RunConfig) -> Result<Vec<IterationResult>> {
        config.validate()?;
        validate_text(original_text)?;

        let mut current_target = self
            .engine
            .to_target(original_text)
            .await
            .map_err(|e| ImproverError::Engine {
                message: format!("initial translation failed: {e}"),
            })?;

        let mut results = Vec::with_capacity(config.max_iterations);

        for iteration in 1..=config.max_iterations {
            info!("Iteration {}/{}", iteration, config.max_iterations);
            debug!("Target text: {}", current_target);

            let outcome = match self.engine.to_source(&current_target).await {
                Ok(back_translated) => {
                    debug!("Back-translated: {}", back_translated);
                    let assessment = self.compare(original_text, &back_translated).await;
                    (back_translated, assessment)
                }
                Err(e) => {
                    warn!("Back-translation failed in iteration {}: {}", iteration, e);
                    let assessment =
                        Assessment::new(0.0, format!("Back-translation failed: {e}"));
                    (String::new(), assessment)
                }
            };
            let (back_translated_text, Assessment { score, suggestions }) = outcome;

            info!("Similarity score: {:.2}", score);

            results.push(IterationResult {
                original_text: original_text.to_string(),
                target_text: current_target.clone(),
                back_translated_text,
                similarity_score: score,
                suggestions: suggestions.clone(),
                iteration,
            });

            if score >= config.similarity_threshold {
                info!("Target similarity ({}) reached", config.similarity_threshold);
                break;
            }

            if iteration < config.max_iterations {
                let suggested = self
                    .improve(original_text, &current_target, &suggestions)
                    .await;
                current_target = self.reviewer.review(&suggested, &current_target);

                if !self.reviewer.proceed(iteration + 1) {
                    info!("Run stopped by reviewer after iteration {}", iteration);
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Score how well `back_translated` preserves `original`
    pub async fn compare(&self, original: &str, back_translated: &str) -> Assessment {
        let prompt = comparison_prompt(original, back_translated);

        match self.service.complete(&prompt, COMPARE_MAX_TOKENS).await {
            Ok(response) => parse_assessment(&response),
            Err(e) => {
                warn!("Error in comparison process: {}", e);
                Assessment::new(
                    DEFAULT_SIMILARITY,
                    format!("Error occurred during comparison: {e}"),
                )
            }
        }
    }

    /// Ask the service for a revised target text; keeps `current_target` on failure
    pub async fn improve(&self, original: &str, current_target: &str, suggestions: &str) -> String {
        let prompt = improvement_prompt(original, current_target, suggestions);

        match self.service.complete(&prompt, IMPROVE_MAX_TOKENS).await {
            Ok(response) => {
                let improved = response.trim();
                if improved.is_empty() {
                    warn!("Improvement service returned empty text, keeping current translation");
                    current_target.to_string()
                } else {
                    info!("Improved translation: {}", improved);
                    improved.to_string()
                }
            }
            Err(e) => {
                warn!("Error in translation improvement: {}", e);
                current_target.to_string()
            }
        }
    }
}
