
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{EmbeddingProvider, GenerationProvider};
use crate::config::{ModeProfile, OllamaConfig};
use crate::{RagError, Result};

const DEFAULT_EMBEDDING_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_GENERATION_TIMEOUT_SECONDS: u64 = 60;

/// Blocking client for a local Ollama server.
///
/// Embedding and generation requests go through separate agents so each can
/// carry its own timeout. Every call is attempted exactly once.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    embedding_agent: ureq::Agent,
    generation_agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Embedding,
    Generation,
    Models,
}

impl Operation {
    fn error(self, message: String) -> RagError {
        match self {
            Self::Embedding => RagError::Embedding(message),
            Self::Generation => RagError::Generation(message),
            Self::Models => RagError::Config(message),
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            embedding_agent: build_agent(Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECONDS)),
            generation_agent: build_agent(Duration::from_secs(
                DEFAULT_GENERATION_TIMEOUT_SECONDS,
            )),
        })
    }

    #[inline]
    pub fn with_embedding_timeout(mut self, timeout: Duration) -> Self {
        self.embedding_agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_agent = build_agent(timeout);
        self
    }

    /// Apply the timeouts of a performance mode
    #[inline]
    pub fn with_profile(self, profile: &ModeProfile) -> Self {
        self.with_embedding_timeout(profile.embedding_timeout)
            .with_generation_timeout(profile.generation_timeout)
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify both models are available
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        for wanted in [&self.embedding_model, &self.generation_model] {
            if !models.iter().any(|m| model_matches(&m.name, wanted)) {
                let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    wanted, available
                );
                return Err(RagError::Config(format!(
                    "Model '{}' is not available. Available models: {:?}",
                    wanted, available
                )));
            }
        }

        info!(
            "Health check passed for Ollama server at {} with models {} and {}",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self.make_request(Operation::Models, &url, || {
            self.embedding_agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Config(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: inputs,
        };
        let url = self.endpoint("/api/embed")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {}", e)))?;

        let response_text = self.make_request(Operation::Embedding, &url, || {
            self.embedding_agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        if response.embeddings.len() != inputs.len() {
            return Err(RagError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                inputs.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::Config(format!("Failed to build URL for {}: {}", path, e)))
    }

    fn make_request<F>(&self, operation: Operation, url: &Url, request_fn: F) -> Result<String>
    where
        F: FnOnce() -> std::result::Result<String, ureq::Error>,
    {
        match request_fn() {
            Ok(response_text) => Ok(response_text),
            Err(error) => {
                warn!("Request to {} failed: {}", url, error);
                Err(match error {
                    ureq::Error::Timeout(timeout) => {
                        RagError::Timeout(format!("{} ({:?})", url, timeout))
                    }
                    ureq::Error::StatusCode(status) => {
                        operation.error(format!("HTTP {} from {}", status, url))
                    }
                    ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                        operation.error(format!(
                            "Could not reach Ollama at {}: {}",
                            self.base_url, error
                        ))
                    }
                    other => operation.error(format!("Request to {} failed: {}", url, other)),
                })
            }
        }
    }
}

impl EmbeddingProvider for OllamaClient {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts in one request", texts.len());
        let embeddings = self.embed(texts)?;
        debug!("Generated {} embeddings total", embeddings.len());
        Ok(embeddings)
    }

    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let inputs = [text.to_string()];
        let embedding = self.embed(&inputs)?.into_iter().next().ok_or_else(|| {
            RagError::Embedding("Ollama returned no embedding".to_string())
        })?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl GenerationProvider for OllamaClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };
        let url = self.endpoint("/api/generate")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {}", e)))?;

        debug!(
            "Generating answer with {} (prompt length: {})",
            self.generation_model,
            prompt.len()
        );

        let response_text = self.make_request(Operation::Generation, &url, || {
            self.generation_agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Generation(format!("Failed to parse generation response: {}", e))
        })?;

        Ok(response.response.trim().to_string())
    }
}

/// Ollama reports `name:tag`; an untagged configured name means `latest`
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || (!wanted.contains(':') && available == format!("{}:latest", wanted))
}
