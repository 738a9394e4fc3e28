
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{RagError, Result};

/// A cached value: either every chunk vector of a corpus or one query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedEmbedding {
    Batch(Vec<Vec<f32>>),
    Single(Vec<f32>),
}

/// Content-addressed embedding store persisted as a single JSON object.
///
/// The in-memory table is authoritative for the whole run. Entries are only
/// ever added, and each insert rewrites the file with the full table.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CachedEmbedding>,
}

/// Key for a corpus: digest of the JSON-encoded ordered chunk texts
#[inline]
pub fn document_batch_key<S: AsRef<str>>(texts: &[S]) -> Result<String> {
    let texts: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
    let encoded = serde_json::to_string(&texts)
        .map_err(|e| RagError::Cache(format!("Failed to encode chunk texts: {}", e)))?;
    Ok(blake3::hash(encoded.as_bytes()).to_hex().to_string())
}

/// Key for a single question: digest of its raw text
#[inline]
pub fn query_key(question: &str) -> String {
    blake3::hash(question.as_bytes()).to_hex().to_string()
}

impl EmbeddingCache {
    /// A cache that is never written to disk
    #[inline]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Read the whole cache file. A missing or unreadable file is an empty cache.
    #[inline]
    pub fn load_all(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, CachedEmbedding>>(
                &content,
            ) {
                Ok(entries) => {
                    info!(
                        "Loaded {} cached embeddings from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    warn!(
                        "Embedding cache {} is corrupt ({}), starting empty",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No embedding cache at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!(
                    "Embedding cache {} could not be read ({}), starting empty",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            entries,
        }
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&CachedEmbedding> {
        self.entries.get(key)
    }

    /// Vector cached under a query key
    #[inline]
    pub fn get_single(&self, key: &str) -> Option<&[f32]> {
        match self.entries.get(key)? {
            CachedEmbedding::Single(vector) => Some(vector),
            CachedEmbedding::Batch(_) => None,
        }
    }

    /// Vectors cached under a document-batch key
    #[inline]
    pub fn get_batch(&self, key: &str) -> Option<&[Vec<f32>]> {
        match self.entries.get(key)? {
            CachedEmbedding::Batch(vectors) => Some(vectors),
            CachedEmbedding::Single(_) => None,
        }
    }

    /// Insert an entry and synchronously rewrite the backing file.
    ///
    /// A failed write is logged and the entry stays in memory only. Empty
    /// query vectors are not stored, since on disk they read back as a batch.
    #[inline]
    pub fn put(&mut self, key: impl Into<String>, value: CachedEmbedding) {
        let key = key.into();
        if matches!(&value, CachedEmbedding::Single(vector) if vector.is_empty()) {
            warn!("Not caching empty query embedding under {}", key);
            return;
        }
        debug!("Caching embedding under {}", key);
        self.entries.insert(key, value);

        if let Err(e) = self.flush() {
            warn!("Failed to persist embedding cache: {}", e);
        }
    }

    /// Write the full table to disk via a temporary file and rename
    #[inline]
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string(&self.entries)
            .map_err(|e| RagError::Cache(format!("Failed to serialize cache: {}", e)))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write cache file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;

        debug!(
            "Flushed {} cache entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}
