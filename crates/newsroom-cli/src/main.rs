/// Newsroom CLI - LLM-driven editorial pipeline.
///
/// Entry point for the newsroom binary. Parses CLI arguments,
/// initializes logging, and dispatches to subcommand handlers.
mod commands;

use clap::Parser;
use newsroom_core::config::Config;
use tracing_subscriber::EnvFilter;

/// LLM-driven editorial pipeline for a static news corpus
#[derive(Parser)]
#[command(name = "newsroom")]
#[command(version)]
#[command(about = "LLM-driven editorial pipeline for a static news corpus")]
#[command(after_help = "\
Quick start:
  1. newsroom pick     — add article URLs for processing
  2. newsroom run      — drive pending articles through the pipeline
  3. newsroom tts      — retry audio generation for published articles
  4. newsroom delete   — remove a published article everywhere")]
struct Cli {
    /// Path to config.toml
    #[arg(
        short = 'c',
        long,
        global = true,
        default_value = "~/.newsroom/config.toml"
    )]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Drive pending candidates through the full pipeline
    Run(commands::RunArgs),
    /// Add article URLs for processing (quick or advanced)
    Pick(commands::PickArgs),
    /// Remove an article: page, record, raw doc, audio, index entry
    Delete(commands::DeleteArgs),
    /// Generate or retry TTS audio for processed articles
    Tts(commands::TtsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose/--quiet flags > default (info).
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("newsroom=debug,newsroom_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("newsroom=info,newsroom_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let config = Config::load(Some(&cli.config))
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    match cli.command {
        Commands::Run(args) => {
            if let Err(errors) = config.validate() {
                for error in &errors {
                    eprintln!("config error: {error}");
                }
                // Unrecoverable config problems exit non-zero.
                std::process::exit(1);
            }
            commands::run::execute(&config, args).await?;
        }
        Commands::Pick(args) => {
            commands::pick::execute(&config, args)?;
        }
        Commands::Delete(args) => {
            commands::delete::execute(&config, args).await?;
        }
        Commands::Tts(args) => {
            commands::tts::execute(&config, args).await?;
        }
    }

    Ok(())
}
