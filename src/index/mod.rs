// Index module
// In-memory cosine similarity search over embedded corpus records


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::CorpusRecord;
use crate::{RagError, Result};

/// How [`VectorIndex::query`] selects the top results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Score every record, stable sort, take the first k
    Exhaustive,
    /// Keep a sorted buffer of k candidates, replacing its minimum only on a strictly better score
    Bounded,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub record: CorpusRecord,
    pub similarity_score: f64,
}

/// Corpus records paired with their embeddings, fixed at construction
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    records: Vec<CorpusRecord>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    position: usize,
    score: f64,
}

/// Cosine similarity over the first `min(a.len(), b.len())` components.
///
/// Returns 0 when either truncated vector has a zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl VectorIndex {
    /// Pair each record with the vector at the same position
    #[inline]
    pub fn build(records: Vec<CorpusRecord>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if records.len() != vectors.len() {
            return Err(RagError::Index(format!(
                "Expected one vector per record, got {} records and {} vectors",
                records.len(),
                vectors.len()
            )));
        }

        debug!(
            "Built vector index with {} records ({} dimensions)",
            records.len(),
            vectors.first().map_or(0, Vec::len)
        );
        Ok(Self { records, vectors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    /// The `k` most similar records, descending by score.
    ///
    /// Equal scores keep record order. An empty index or `k == 0` yields nothing.
    #[inline]
    pub fn query(&self, vector: &[f32], k: usize, strategy: SearchStrategy) -> Vec<SearchResult> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let scored = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, candidate)| Scored {
                position,
                score: cosine_similarity(vector, candidate),
            });

        let top = match strategy {
            SearchStrategy::Exhaustive => exhaustive(scored, k),
            SearchStrategy::Bounded => bounded(scored, k),
        };

        debug!(
            "{:?} search returned {} of {} records (best score {:.3})",
            strategy,
            top.len(),
            self.len(),
            top.first().map_or(0.0, |s| s.score)
        );

        top.into_iter()
            .filter_map(|scored| {
                self.records
                    .get(scored.position)
                    .map(|record| SearchResult {
                        record: record.clone(),
                        similarity_score: scored.score,
                    })
            })
            .collect()
    }
}

fn sort_descending(scored: &mut [Scored]) {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn exhaustive(scored: impl Iterator<Item = Scored>, k: usize) -> Vec<Scored> {
    let mut all: Vec<Scored> = scored.collect();
    sort_descending(&mut all);
    all.truncate(k);
    all
}

fn bounded(scored: impl Iterator<Item = Scored>, k: usize) -> Vec<Scored> {
    let mut buffer: Vec<Scored> = Vec::with_capacity(k);

    for candidate in scored {
        if buffer.len() < k {
            buffer.push(candidate);
            sort_descending(&mut buffer);
            continue;
        }

        // The buffer stays sorted, so its last entry is the minimum
        let Some(minimum) = buffer.last_mut() else {
            continue;
        };
        if candidate.score > minimum.score {
            *minimum = candidate;
            sort_descending(&mut buffer);
        }
    }

    buffer
}
