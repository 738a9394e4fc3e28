use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("FAQ error: {0}")]
    Faq(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Provider call timed out: {0}")]
    Timeout(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Required document could not be read: {path}: {source}")]
    RequiredDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod faq;
pub mod index;
pub mod orchestrator;
