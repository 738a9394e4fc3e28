// Embeddings module
// Provider seams, the Ollama client, content chunking and the embedding cache

pub mod cache;
pub mod chunking;
pub mod ollama;

pub use cache::{CachedEmbedding, EmbeddingCache, document_batch_key, query_key};
pub use chunking::{ChunkingConfig, split_documents, split_text};
pub use ollama::{ModelInfo, OllamaClient};

use crate::Result;

/// Turns text into embedding vectors.
///
/// Calls may be slow or fail; callers wrap every call with the [`EmbeddingCache`].
pub trait EmbeddingProvider: Send + Sync {
    /// Embed many texts in one request, preserving order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces an answer from a fully assembled prompt
pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}
