//! Back-translation improver - iterative translation quality library
//!
//! This library translates text, back-translates it, scores the round trip with
//! a chat-completions service and rewrites the translation until it converges.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    config::ImproverConfig,
    engine::{HttpTranslationEngine, TranslationEngine},
    errors::ImproverError,
    improver::{best_result, parse_assessment, AutoAccept, ImprovementLoop, Reviewer},
    models::{Assessment, IterationResult, RunConfig},
    service::{FallbackResponder, GigaChatClient, ImprovementBackend, ImprovementService},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
