#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::index::SearchStrategy;

/// Fixed latency/recall profile selected once at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    #[default]
    Normal,
    Fast,
    UltraFast,
}

/// Which prompt template the generation step uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Verbose,
    Terse,
}

/// Every knob a [`PerformanceMode`] controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters
    pub chunk_overlap: usize,
    /// Number of chunks retrieved as context
    pub top_k: usize,
    pub strategy: SearchStrategy,
    pub embedding_timeout: Duration,
    pub generation_timeout: Duration,
    pub prompt_style: PromptStyle,
}

impl PerformanceMode {
    pub const ALL: [Self; 3] = [Self::Normal, Self::Fast, Self::UltraFast];

    #[inline]
    pub const fn profile(self) -> ModeProfile {
        match self {
            Self::Normal => ModeProfile {
                chunk_size: 500,
                chunk_overlap: 50,
                top_k: 5,
                strategy: SearchStrategy::Exhaustive,
                embedding_timeout: Duration::from_secs(30),
                generation_timeout: Duration::from_secs(60),
                prompt_style: PromptStyle::Verbose,
            },
            Self::Fast => ModeProfile {
                chunk_size: 800,
                chunk_overlap: 80,
                top_k: 3,
                strategy: SearchStrategy::Bounded,
                embedding_timeout: Duration::from_secs(15),
                generation_timeout: Duration::from_secs(20),
                prompt_style: PromptStyle::Terse,
            },
            Self::UltraFast => ModeProfile {
                chunk_size: 1000,
                chunk_overlap: 50,
                top_k: 2,
                strategy: SearchStrategy::Bounded,
                embedding_timeout: Duration::from_secs(8),
                generation_timeout: Duration::from_secs(10),
                prompt_style: PromptStyle::Terse,
            },
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Fast => "fast",
            Self::UltraFast => "ultra_fast",
        }
    }
}

impl fmt::Display for PerformanceMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceMode {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            "ultra_fast" | "ultrafast" | "ultra" => Ok(Self::UltraFast),
            other => Err(format!(
                "unknown performance mode '{}' (expected normal, fast or ultra-fast)",
                other
            )),
        }
    }
}
