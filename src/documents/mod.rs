// Documents module
// Loads the primary documentation and discovers source files to index


use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::DocumentsConfig;
use crate::{RagError, Result};

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Documentation,
    SourceCode,
}

impl fmt::Display for DocumentKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Documentation => "documentation",
            Self::SourceCode => "source_code",
        })
    }
}

/// A whole file before chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    /// Where the text came from, usually a file path
    pub source: String,
    pub kind: DocumentKind,
}

/// One retrievable chunk of a [`Document`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub text: String,
    pub source: String,
    pub kind: DocumentKind,
}

impl Document {
    #[inline]
    pub fn new(text: impl Into<String>, source: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            kind,
        }
    }
}

/// Read the required README followed by every qualifying source file.
///
/// Failing to read the README is the one fatal error; unreadable source files
/// are skipped.
#[inline]
pub fn load_documents(config: &DocumentsConfig) -> Result<Vec<Document>> {
    let readme = fs::read_to_string(&config.readme).map_err(|source| {
        RagError::RequiredDocument {
            path: config.readme.clone(),
            source,
        }
    })?;
    info!(
        "Read {} ({} characters)",
        config.readme.display(),
        readme.chars().count()
    );

    let mut documents = vec![Document::new(
        readme,
        config.readme.display().to_string(),
        DocumentKind::Documentation,
    )];

    for dir in &config.source_dirs {
        let before = documents.len();
        discover_source_files(dir, config, &mut documents);
        info!(
            "Discovered {} source files under {}",
            documents.len() - before,
            dir.display()
        );
    }

    Ok(documents)
}

fn discover_source_files(root: &Path, config: &DocumentsConfig, documents: &mut Vec<Document>) {
    if !root.is_dir() {
        warn!("Source directory {} does not exist, skipping", root.display());
        return;
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_wanted_extension(entry.path(), config) {
            continue;
        }

        let text = match fs::read_to_string(entry.path()) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", entry.path().display(), e);
                continue;
            }
        };

        if text.trim().chars().count() < config.min_content_length {
            debug!("Skipping short file {}", entry.path().display());
            continue;
        }

        documents.push(Document::new(
            text,
            entry.path().display().to_string(),
            DocumentKind::SourceCode,
        ));
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn has_wanted_extension(path: &Path, config: &DocumentsConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            config
                .extensions
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(ext))
        })
}
