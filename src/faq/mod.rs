// FAQ module
// Instant answers for curated questions, scored without any embeddings


pub mod scorer;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_FAQ_CANDIDACY_THRESHOLD;
use crate::{RagError, Result};

/// A curated group of equivalent questions sharing one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqCategory {
    pub name: String,
    pub questions: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub command: Option<String>,
    /// The command is safe to run without confirmation
    #[serde(default)]
    pub executable: bool,
}

/// Best FAQ hit for a question
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub category: String,
    pub answer: String,
    pub command: Option<String>,
    pub executable: bool,
    pub score: f64,
    pub matched_question: String,
}

/// Confidence band attached to an instant answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Exact or substring match
    High,
    /// Token overlap above the candidacy threshold
    Partial,
}

/// A [`MatchResult`] annotated with how it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct InstantAnswer {
    pub result: MatchResult,
    pub confidence: Confidence,
}

impl InstantAnswer {
    #[inline]
    pub fn score(&self) -> f64 {
        self.result.score
    }
}

#[derive(Debug, Deserialize)]
struct FaqFile {
    #[serde(default, rename = "category")]
    categories: Vec<FaqCategory>,
}

/// Scans every canonical question of every category for the best match
#[derive(Debug, Clone)]
pub struct FaqMatcher {
    categories: Vec<FaqCategory>,
    candidacy_threshold: f64,
}

impl Default for FaqMatcher {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl FaqMatcher {
    #[inline]
    pub fn new(categories: Vec<FaqCategory>) -> Self {
        Self {
            categories,
            candidacy_threshold: DEFAULT_FAQ_CANDIDACY_THRESHOLD,
        }
    }

    /// A matcher that never matches
    #[inline]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn with_candidacy_threshold(mut self, threshold: f64) -> Self {
        self.candidacy_threshold = threshold;
        self
    }

    /// Load the FAQ table from a TOML file.
    ///
    /// A missing or malformed file degrades to an empty matcher; this never fails.
    #[inline]
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "FAQ file {} could not be read ({}), instant answers disabled",
                    path.display(),
                    e
                );
                return Self::empty();
            }
        };

        match Self::from_toml_str(&content) {
            Ok(matcher) => {
                info!(
                    "Loaded {} FAQ categories from {}",
                    matcher.categories.len(),
                    path.display()
                );
                matcher
            }
            Err(e) => {
                warn!(
                    "FAQ file {} is invalid ({}), instant answers disabled",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Parse and validate a TOML FAQ document
    #[inline]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FaqFile =
            toml::from_str(content).map_err(|e| RagError::Faq(format!("parse error: {}", e)))?;

        let categories = file
            .categories
            .into_iter()
            .filter_map(validate_category)
            .collect();

        Ok(Self::new(categories))
    }

    #[inline]
    pub fn categories(&self) -> &[FaqCategory] {
        &self.categories
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Highest-scoring canonical question at or above the candidacy threshold.
    ///
    /// A later candidate only replaces the current best when it scores strictly
    /// higher, so the first one seen wins ties.
    #[inline]
    pub fn find_best_match(&self, question: &str) -> Option<MatchResult> {
        let mut best: Option<(&FaqCategory, &str, f64)> = None;

        for category in &self.categories {
            for canonical in &category.questions {
                let score = scorer::score(question, canonical);
                if score < self.candidacy_threshold {
                    continue;
                }
                if best.is_none_or(|(_, _, best_score)| score > best_score) {
                    best = Some((category, canonical.as_str(), score));
                }
            }
        }

        let (category, canonical, score) = best?;
        debug!(
            "FAQ candidate '{}' (category {}) scored {:.3}",
            canonical, category.name, score
        );

        Some(MatchResult {
            category: category.name.clone(),
            answer: category.answer.clone(),
            command: category.command.clone(),
            executable: category.executable,
            score,
            matched_question: canonical.to_string(),
        })
    }

    /// [`Self::find_best_match`] with a confidence annotation
    #[inline]
    pub fn instant_answer(&self, question: &str) -> Option<InstantAnswer> {
        self.find_best_match(question).map(|result| {
            let confidence = if result.score >= scorer::SUBSTRING_MATCH_SCORE {
                Confidence::High
            } else {
                Confidence::Partial
            };
            InstantAnswer { result, confidence }
        })
    }
}

fn validate_category(mut category: FaqCategory) -> Option<FaqCategory> {
    category.questions.retain(|q| !q.trim().is_empty());

    if category.questions.is_empty() {
        warn!("Skipping FAQ category '{}': no questions", category.name);
        return None;
    }

    if category.answer.trim().is_empty() {
        warn!("Skipping FAQ category '{}': empty answer", category.name);
        return None;
    }

    if category
        .command
        .as_deref()
        .is_some_and(|command| command.trim().is_empty())
    {
        category.command = None;
    }

    // Nothing to run without a command
    if category.command.is_none() {
        category.executable = false;
    }

    Some(category)
}
