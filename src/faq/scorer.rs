//! Lexical similarity between a user question and a canonical FAQ question.

/// Score awarded when both strings are equal after normalization
pub const EXACT_MATCH_SCORE: f64 = 1.0;
/// Score awarded when one normalized string contains the other
pub const SUBSTRING_MATCH_SCORE: f64 = 0.9;

/// Score `candidate` against `canonical` in `[0, 1]`.
///
/// Rules are tried in order and the first one that applies wins:
/// 1. equal after trimming and lowercasing: `1.0`
/// 2. one contains the other: `0.9`
/// 3. otherwise the fraction of candidate tokens that overlap (substring in
///    either direction) with some canonical token, divided by the larger of
///    the two token counts
#[inline]
pub fn score(candidate: &str, canonical: &str) -> f64 {
    let candidate = normalize(candidate);
    let canonical = normalize(canonical);

    if candidate == canonical {
        return EXACT_MATCH_SCORE;
    }

    if candidate.contains(canonical.as_str()) || canonical.contains(candidate.as_str()) {
        return SUBSTRING_MATCH_SCORE;
    }

    token_overlap(&candidate, &canonical)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn token_overlap(candidate: &str, canonical: &str) -> f64 {
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
    let canonical_tokens: Vec<&str> = canonical.split_whitespace().collect();

    let denominator = candidate_tokens.len().max(canonical_tokens.len());
    if denominator == 0 {
        return 0.0;
    }

    let covered = candidate_tokens
        .iter()
        .filter(|token| {
            canonical_tokens
                .iter()
                .any(|other| other.contains(**token) || token.contains(*other))
        })
        .count();

    covered as f64 / denominator as f64
}
