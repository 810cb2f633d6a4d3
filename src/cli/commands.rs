//! CLI command definitions and handlers

use clap::Subcommand;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::core::config::ImproverConfig;
use crate::core::engine::HttpTranslationEngine;
use crate::core::improver::{best_result, ImprovementLoop, Reviewer};
use crate::core::models::{IterationResult, RunConfig};
use crate::core::service::ImprovementBackend;

/// Commands for the back-translation improver
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a text file and iteratively improve the translation
    Improve {
        /// File with the source text (prompted for if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum number of iterations
        #[arg(short = 'n', long, default_value_t = 3)]
        max_iterations: usize,

        /// Stop once the similarity score reaches this value
        #[arg(short, long, default_value_t = 0.85)]
        threshold: f64,

        /// Review every suggested rewrite before it is used
        #[arg(short, long)]
        interactive: bool,
    },

    /// Write the effective configuration to a JSON file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "improver.json")]
        output: PathBuf,
    },
}

/// Reviewer that lets a person accept, keep or edit each rewrite,
/// and decide whether the next iteration runs
#[derive(Debug, Default)]
pub struct InteractiveReviewer;

impl Reviewer for InteractiveReviewer {
    fn review(&self, suggested: &str, current: &str) -> String {
        println!("\nCurrent translation:   {}", current);
        println!("Suggested translation: {}", suggested);

        let edited = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Edit translation (leave blank to accept the suggestion)")
            .allow_empty(true)
            .interact_text();

        choose_edit(edited, suggested)
    }

    fn proceed(&self, next: usize) -> bool {
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Continue to iteration {}?", next))
            .default(true)
            .interact();

        resolve_continue(answer)
    }
}

/// Edited text if one was typed, otherwise the suggestion
fn choose_edit(edited: Result<String, dialoguer::Error>, suggested: &str) -> String {
    match edited {
        Ok(edited) if !edited.trim().is_empty() => edited.trim().to_string(),
        Ok(_) => suggested.to_string(),
        Err(e) => {
            warn!("Could not read edited translation, accepting suggestion: {}", e);
            suggested.to_string()
        }
    }
}

/// Unanswerable prompts end the run
fn resolve_continue(answer: Result<bool, dialoguer::Error>) -> bool {
    match answer {
        Ok(proceed) => proceed,
        Err(e) => {
            warn!("Could not read answer, stopping the run: {}", e);
            false
        }
    }
}

/// Keep asking for a path until a readable, non-empty file is given
fn prompt_for_text() -> anyhow::Result<String> {
    loop {
        let filename: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Enter the filename containing the English text (e.g., file.txt)")
            .interact_text()?;

        match read_source_text(Path::new(filename.trim())) {
            Ok(text) => return Ok(text),
            Err(e) => eprintln!("{e}. Please try again."),
        }
    }
}

fn read_source_text(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Error reading '{}': {}", path.display(), e))?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("File '{}' is empty", path.display());
    }
    Ok(text.to_string())
}

fn print_trace(results: &[IterationResult]) {
    for result in results {
        println!("\n--- Iteration {} ---", result.iteration);
        println!("Russian:          {}", result.target_text);
        println!("Back-translated:  {}", result.back_translated_text);
        println!("Similarity score: {:.2}", result.similarity_score);
        println!("Suggestions:      {}", result.suggestions);
    }
}

/// Handle the improve command
pub async fn handle_improve(
    config: ImproverConfig,
    file: Option<PathBuf>,
    max_iterations: usize,
    threshold: f64,
    interactive: bool,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::{Duration, Instant};
    use tracing::info;

    let run_config = RunConfig::new(max_iterations, threshold);
    run_config.validate()?;

    let text = match file {
        Some(path) => read_source_text(&path)?,
        None => prompt_for_text()?,
    };

    println!("\nOriginal English: {}", text);

    let backend = ImprovementBackend::new(&config)?;
    if !backend.is_live() {
        println!("No GigaChat token found. Using fallback mode.");
        println!("To get a free token: https://developers.sber.ru/portal/products/gigachat");
    }

    let engine = HttpTranslationEngine::new(config)?;
    let mut improver = ImprovementLoop::new(Arc::new(engine), Arc::new(backend));
    if interactive {
        improver = improver.with_reviewer(InteractiveReviewer);
    }

    let start_time = Instant::now();
    info!(
        "Starting improvement: max_iterations={}, threshold={}",
        max_iterations, threshold
    );

    let spinner = if interactive {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        pb.set_message("Improving translation...");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let outcome = improver.run(&text, &run_config).await;
    spinner.finish_and_clear();

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            eprintln!("An error occurred: {}", e);
            eprintln!("\nTroubleshooting tips:");
            eprintln!("1. Get a free GigaChat token: https://developers.sber.ru/portal/products/gigachat");
            eprintln!("2. Set environment variable: GIGACHAT_TOKEN=your_token_here");
            eprintln!("3. Check TRANSLATION_API_KEY and TRANSLATION_ENDPOINT");
            return Err(e.into());
        }
    };

    print_trace(&results);

    if let Some(best) = best_result(&results) {
        println!("\nBest result (similarity: {:.2}):", best.similarity_score);
        println!("  Final Russian translation: {}", best.target_text);
    }

    info!(
        "Completed {} iterations in {:?}",
        results.len(),
        start_time.elapsed()
    );

    Ok(())
}

/// Handle the init-config command
pub async fn handle_init_config(config: ImproverConfig, output: PathBuf) -> anyhow::Result<()> {
    use tracing::info;

    config.validate()?;
    config.to_file(&output)?;

    info!("Configuration written to {}", output.display());
    println!("✅ Configuration saved to {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn closed_stdin() -> dialoguer::Error {
        dialoguer::Error::IO(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "stdin closed",
        ))
    }

    #[test]
    fn test_choose_edit() {
        assert_eq!(choose_edit(Ok("  Здравствуйте ".to_string()), "Привет"), "Здравствуйте");
        assert_eq!(choose_edit(Ok("   ".to_string()), "Привет"), "Привет");
        assert_eq!(choose_edit(Err(closed_stdin()), "Привет"), "Привет");
    }

    #[test]
    fn test_resolve_continue() {
        assert!(resolve_continue(Ok(true)));
        assert!(!resolve_continue(Ok(false)));
        assert!(!resolve_continue(Err(closed_stdin())));
    }

    #[test]
    fn test_read_source_text_trims() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  Hello, how are you  ").unwrap();

        let text = read_source_text(file.path()).unwrap();
        assert_eq!(text, "Hello, how are you");
    }

    #[test]
    fn test_read_source_text_rejects_empty_and_missing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(read_source_text(file.path()).is_err());
        assert!(read_source_text(Path::new("/nonexistent/source.txt")).is_err());
    }

    #[tokio::test]
    async fn test_init_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("improver.json");

        handle_init_config(ImproverConfig::default(), output.clone())
            .await
            .unwrap();

        let loaded = ImproverConfig::from_file(&output).unwrap();
        assert_eq!(loaded.target_lang, "ru");
    }
}
