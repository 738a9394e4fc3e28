
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use super::mode::PerformanceMode;

/// Minimum score for a canonical question to become an FAQ candidate
pub const DEFAULT_FAQ_CANDIDACY_THRESHOLD: f64 = 0.4;
/// Minimum score for an FAQ candidate to be accepted as the final answer
pub const DEFAULT_FAQ_ACCEPTANCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3.2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub mode: PerformanceMode,
    pub faq_candidacy_threshold: f64,
    pub faq_acceptance_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: PerformanceMode::default(),
            faq_candidacy_threshold: DEFAULT_FAQ_CANDIDACY_THRESHOLD,
            faq_acceptance_threshold: DEFAULT_FAQ_ACCEPTANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Primary documentation file; the process cannot start without it
    pub readme: PathBuf,
    /// Directories scanned for source files
    pub source_dirs: Vec<PathBuf>,
    /// File extensions (without the dot) treated as source code
    pub extensions: Vec<String>,
    /// Source files shorter than this many characters are skipped
    pub min_content_length: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            readme: PathBuf::from("./docs/README.md"),
            source_dirs: Vec::new(),
            extensions: ["ts", "js", "rs", "py", "go", "sol"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_content_length: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub faq_file: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidThreshold(f64),
    #[error("FAQ candidacy threshold ({0}) must not exceed the acceptance threshold ({1})")]
    ThresholdOrder(f64, f64),
    #[error("Invalid extension: '{0}' (must be non-empty and without a leading dot)")]
    InvalidExtension(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when absent
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Default base directory, `~/.docs-rag`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".docs-rag"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("docs-rag"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.retrieval.validate()?;
        self.documents.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// FAQ table location, `<base>/faq.toml` unless overridden
    #[inline]
    pub fn faq_path(&self) -> PathBuf {
        self.paths
            .faq_file
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("faq.toml"))
    }

    /// Embedding cache location, `<base>/embeddings_cache.json` unless overridden
    #[inline]
    pub fn cache_path(&self) -> PathBuf {
        self.paths
            .cache_file
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("embeddings_cache.json"))
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}://{}:{}",
                self.protocol, self.host, self.port
            )));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_generation_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.generation_model = model;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for threshold in [self.faq_candidacy_threshold, self.faq_acceptance_threshold] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidThreshold(threshold));
            }
        }

        // The two gates are tuned separately, but acceptance is never looser than candidacy
        if self.faq_candidacy_threshold > self.faq_acceptance_threshold {
            return Err(ConfigError::ThresholdOrder(
                self.faq_candidacy_threshold,
                self.faq_acceptance_threshold,
            ));
        }

        Ok(())
    }
}

impl DocumentsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|ext| ext.trim().is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::InvalidExtension(bad.clone()));
        }
        Ok(())
    }
}
