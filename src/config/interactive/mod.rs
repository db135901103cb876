
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::settings::{DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};
use super::{Config, ConfigError, EmbeddingConfig, ProviderKind, SearchConfig};

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Content RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir)?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Configure the model used to embed site content and chat queries.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Search Defaults").bold().yellow());
    configure_search(&mut config.search)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_provider_connection(&config.embedding)? {
        eprintln!("{}", style("✓ Embedding provider reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding provider").yellow()
        );
        eprintln!("You can continue, but make sure it is reachable before reindexing.");
    }

    if let Err(e) = config.api_key() {
        eprintln!("{} {}", style("⚠").yellow(), e);
    }

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
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    match config.embedding_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    if config.embedding.provider.requires_api_key() {
        let key_state = if config.api_key().is_ok() {
            style("set").green()
        } else {
            style("missing").red()
        };
        eprintln!(
            "  API key: ${} ({})",
            style(&config.embedding.api_key_env).cyan(),
            key_state
        );
    }

    eprintln!();
    eprintln!("{}", style("Indexing Settings:").bold().yellow());
    eprintln!(
        "  Concurrency: {}",
        style(config.indexing.concurrency).cyan()
    );
    eprintln!(
        "  Failure policy: {}",
        style(config.indexing.failure_policy).cyan()
    );
    eprintln!(
        "  Retry attempts: {}",
        style(config.indexing.retry_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Search Settings:").bold().yellow());
    eprintln!("  Threshold: {}", style(config.search.threshold).cyan());
    eprintln!("  Max results: {}", style(config.search.max_results).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Database: {}",
        style(config.database_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Result<Config> {
    if base_dir.join("config.toml").exists() {
        let config = Config::load(base_dir)?;
        eprintln!("{}", style("Found existing configuration.").green());
        Ok(config)
    } else {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        Ok(Config {
            base_dir: base_dir.to_path_buf(),
            ..Config::default()
        })
    }
}

/// Suggested endpoint when switching providers; keeps a customised URL as is
fn default_url_for(provider: ProviderKind, current: &str) -> String {
    let is_stock = current == DEFAULT_OPENAI_URL || current == DEFAULT_OLLAMA_URL;
    match provider {
        _ if !is_stock => current.to_string(),
        ProviderKind::OpenAi => DEFAULT_OPENAI_URL.to_string(),
        ProviderKind::Ollama => DEFAULT_OLLAMA_URL.to_string(),
    }
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let providers = &[ProviderKind::OpenAi, ProviderKind::Ollama];
    let default_index = providers
        .iter()
        .position(|&p| p == embedding.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(providers)
        .interact()?;

    let provider = providers[provider_index];

    let base_url: String = Input::new()
        .with_prompt("Provider URL")
        .default(default_url_for(provider, &embedding.base_url))
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = EmbeddingConfig {
                base_url: input.clone(),
                ..EmbeddingConfig::default()
            };
            candidate.url().map(|_| ())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(embedding.dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    if provider.requires_api_key() {
        let api_key_env: String = Input::new()
            .with_prompt("Environment variable holding the API key")
            .default(embedding.api_key_env.clone())
            .interact_text()?;
        embedding.set_api_key_env(api_key_env)?;
    }

    embedding.provider = provider;
    embedding.set_base_url(base_url)?;
    embedding.set_model(model)?;
    embedding.set_dimension(dimension)?;

    Ok(())
}

fn configure_search(search: &mut SearchConfig) -> Result<()> {
    let threshold: f32 = Input::new()
        .with_prompt("Default similarity threshold (0-1)")
        .default(search.threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Threshold must be between 0 and 1")
            }
        })
        .interact_text()?;

    search.set_threshold(threshold)?;
    Ok(())
}

fn test_provider_connection(embedding: &EmbeddingConfig) -> Result<bool> {
    let url = embedding.url()?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
