//! Main entry point for the back-translation improver CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backtranslate_improver::cli::commands::{self, Commands};
use backtranslate_improver::ImproverConfig;

/// Back-translation improver - iterative translation quality tool
#[derive(Parser, Debug)]
#[command(name = "backtranslate-improver", version, about, long_about = None)]
struct Args {
    /// GigaChat token (optional, defaults to GIGACHAT_TOKEN env var)
    #[arg(long)]
    token: Option<String>,

    /// JSON configuration file (defaults to environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("backtranslate_improver={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => ImproverConfig::from_file(path)?,
        None => ImproverConfig::from_env()?,
    }
    .with_token(args.token);

    match args.command {
        Some(Commands::Improve {
            file,
            max_iterations,
            threshold,
            interactive,
        }) => {
            commands::handle_improve(config, file, max_iterations, threshold, interactive).await?;
        }
        Some(Commands::InitConfig { output }) => {
            commands::handle_init_config(config, output).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
