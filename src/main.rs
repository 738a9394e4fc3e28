use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docs_rag::Result;
use docs_rag::commands::{ask, chat, faq, search};
use docs_rag::config::{
    Config, PerformanceMode, get_config_dir, run_interactive_config, show_config,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Answers questions about a CLI tool from its FAQ and documentation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, faq.toml and the embedding cache
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Performance mode: normal, fast or ultra-fast
    #[arg(long, global = true)]
    mode: Option<PerformanceMode>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one or more questions
    Ask {
        #[arg(required = true)]
        questions: Vec<String>,
    },
    /// Ask questions interactively
    Chat,
    /// Show the chunks retrieved for a question
    Search { question: String },
    /// Show the FAQ match for a question
    Faq { question: String },
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_dir = get_config_dir(cli.config_dir.as_deref())?;
    let mut config = Config::load(&config_dir)?;
    if let Some(mode) = cli.mode {
        config.retrieval.mode = mode;
    }

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
            return Ok(());
        }
        Commands::Ask { questions } => {
            config.validate()?;
            ask(&config, &questions)?;
        }
        Commands::Chat => {
            config.validate()?;
            chat(&config)?;
        }
        Commands::Search { question } => {
            config.validate()?;
            search(&config, &question)?;
        }
        Commands::Faq { question } => {
            config.validate()?;
            faq(&config, &question)?;
        }
    }

    Ok(())
}
