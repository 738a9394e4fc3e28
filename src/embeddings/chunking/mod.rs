
use std::collections::VecDeque;

use tracing::debug;

use crate::config::{ModeProfile, PerformanceMode};
use crate::documents::{CorpusRecord, Document};

/// Separators tried from coarsest to finest; the empty separator splits characters
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Configuration for content chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self::from(&PerformanceMode::default().profile())
    }
}

impl From<&ModeProfile> for ChunkingConfig {
    #[inline]
    fn from(profile: &ModeProfile) -> Self {
        Self {
            chunk_size: profile.chunk_size,
            chunk_overlap: profile.chunk_overlap,
        }
    }
}

/// Split every document into corpus records, keeping document order
#[inline]
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<CorpusRecord> {
    let records: Vec<CorpusRecord> = documents
        .iter()
        .flat_map(|document| {
            split_text(&document.text, config)
                .into_iter()
                .map(|text| CorpusRecord {
                    text,
                    source: document.source.clone(),
                    kind: document.kind,
                })
        })
        .collect();

    debug!(
        "Chunked {} documents into {} records (avg {} chars)",
        documents.len(),
        records.len(),
        records.iter().map(|r| char_len(&r.text)).sum::<usize>() / records.len().max(1)
    );

    records
}

/// Recursively split `text` into chunks of at most `chunk_size` characters.
///
/// Chunks that fit are merged greedily with the current separator and adjacent
/// chunks share up to `chunk_overlap` characters of whole pieces.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    split_recursive(text, SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let (separator, finer) = pick_separator(text, separators);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.split_inclusive(|_: char| true).collect()
    } else {
        text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) < config.chunk_size {
            fitting.push(piece);
            continue;
        }

        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, separator, config));
            fitting.clear();
        }

        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, config));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, config));
    }

    chunks
}

/// First separator present in `text`, and the finer separators after it
fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn merge_pieces(pieces: &[&str], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);
        let joined_len = |total: usize, window: &VecDeque<&str>| {
            total + len + if window.is_empty() { 0 } else { separator_len }
        };

        if joined_len(total, &window) > config.chunk_size {
            if let Some(chunk) = join_window(&window, separator) {
                chunks.push(chunk);
            }

            // Drop pieces from the front until only the overlap remains and the new piece fits
            while total > config.chunk_overlap
                || (total > 0 && joined_len(total, &window) > config.chunk_size)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
            }
        }

        total += len + if window.is_empty() { 0 } else { separator_len };
        window.push_back(piece);
    }

    if let Some(chunk) = join_window(&window, separator) {
        chunks.push(chunk);
    }

    chunks
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
