
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig, PerformanceMode};
use crate::embeddings::{ModelInfo, OllamaClient};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Docs RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embeddings and answers.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_mode(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    check_ollama(&config.ollama);

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!(
        "  Generation Model: {}",
        style(&config.ollama.generation_model).cyan()
    );

    eprintln!();
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    let profile = config.retrieval.mode.profile();
    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Mode: {}", style(config.retrieval.mode).cyan());
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(profile.chunk_size).cyan(),
        style(profile.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(profile.top_k).cyan());
    eprintln!(
        "  FAQ Thresholds (candidacy / acceptance): {} / {}",
        style(config.retrieval.faq_candidacy_threshold).cyan(),
        style(config.retrieval.faq_acceptance_threshold).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Documents:").bold().yellow());
    eprintln!("  README: {}", style(config.documents.readme.display()).cyan());
    for dir in &config.documents.source_dirs {
        eprintln!("  Source Dir: {}", style(dir.display()).cyan());
    }

    eprintln!();
    eprintln!("FAQ file: {}", style(config.faq_path().display()).dim());
    eprintln!("Cache file: {}", style(config.cache_path().display()).dim());
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let generation_model: String = Input::new()
        .with_prompt("Generation model")
        .default(ollama.generation_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_generation_model(generation_model)?;

    Ok(())
}

fn configure_mode(config: &mut Config) -> Result<()> {
    let labels = &[
        "normal (5 chunks, exhaustive search)",
        "fast (3 chunks, early termination)",
        "ultra-fast (2 chunks, short timeouts)",
    ];
    let default_index = PerformanceMode::ALL
        .iter()
        .position(|&m| m == config.retrieval.mode)
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt("Performance mode")
        .default(default_index)
        .items(labels)
        .interact()?;

    config.retrieval.mode = PerformanceMode::ALL[index];
    Ok(())
}

#[allow(clippy::ptr_arg, reason = "dialoguer validators receive &String")]
fn non_empty_model(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn check_ollama(ollama: &OllamaConfig) {
    let client = match OllamaClient::new(ollama) {
        Ok(client) => client.with_embedding_timeout(Duration::from_secs(5)),
        Err(e) => {
            eprintln!("{} {}", style("❌ Invalid Ollama settings:").red(), e);
            return;
        }
    };

    match client.health_check() {
        Ok(()) => {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
            eprintln!(
                "  Models: {} / {}",
                style(&ollama.embedding_model).cyan(),
                style(&ollama.generation_model).cyan()
            );
        }
        Err(e) => {
            eprintln!("{} {}", style("⚠ Ollama health check failed:").yellow(), e);
            match client.list_models() {
                Ok(models) => {
                    eprintln!("Available models:");
                    for model in &models {
                        eprintln!("  {}", describe_model(model));
                    }
                    eprintln!("Pull missing models with `ollama pull <model>` before asking questions.");
                }
                Err(_) => eprintln!(
                    "You can continue, but make sure Ollama is running before asking questions."
                ),
            }
        }
    }
}

fn describe_model(model: &ModelInfo) -> String {
    let size = model
        .size
        .map(|bytes| format!(" ({:.1} GB)", bytes as f64 / 1e9))
        .unwrap_or_default();
    let digest = model
        .digest
        .as_deref()
        .map(|digest| format!(" [{}]", digest.get(..12).unwrap_or(digest)))
        .unwrap_or_default();
    format!("{}{}{}", model.name, size, digest)
}
