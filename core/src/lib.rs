//! Kata profanity engine.
//! Finds disguised offensive words (leetspeak, inserted characters, words
//! embedded in benign text) with deterministic string matching, redacts them
//! with dictionary replacements and scores detection quality against an
//! optional ground-truth list.

pub mod dictionary;
pub mod error;
pub mod fuzzy;
pub mod guard;
pub mod metrics;
pub mod normalize;
pub mod paraphrase;
pub mod pipeline;
pub mod redact;
pub mod resolve;
pub mod shift;

use serde::{Deserialize, Serialize};

pub use dictionary::{
    CommonWordSource, DictionaryFile, Snapshot, StaticSource, TermEntry, TermRecord, TermSource,
};
pub use error::{Error, ParaphraseError, Result};
pub use guard::{CommonWords, DEFAULT_COMMON_WORDS};
pub use metrics::{ConfusionMatrix, Metrics};
pub use normalize::{normalize, normalize_word, NormalizationMap};
pub use paraphrase::{HttpParaphraser, Paraphraser};
pub use pipeline::{Comparison, Engine, Overlap, PipelineFlags, ScanResult, Strategy, StrategySummary};

/// A located dictionary hit in original-text byte offsets.
///
/// `raw_word` is always `original[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub pattern: String,
    pub replacement: String,
    pub start: usize,
    pub end: usize,
    pub raw_word: String,
}

/// Length thresholds for trusting a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingRules {
    /// Dictionary patterns shorter than this are dropped at load.
    pub min_exact_len: usize,
    pub min_fuzzy_len: usize,
    /// Patterns at most this long are only accepted on exact token equality.
    pub short_pattern_len: usize,
}

impl Default for MatchingRules {
    fn default() -> Self {
        Self {
            min_exact_len: 2,
            min_fuzzy_len: 4,
            short_pattern_len: 2,
        }
    }
}

/// Fallback common words used when the source has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonWordDefaults {
    pub fallback: Vec<String>,
}

impl Default for CommonWordDefaults {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_COMMON_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParaphraseConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_sentence_chars: usize,
}

impl Default for ParaphraseConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".into(),
            timeout_ms: 5000,
            max_sentence_chars: 500,
        }
    }
}

/// Per-scan switches; every field can be overridden by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub use_normalization: bool,
    pub use_fuzzy_matching: bool,
    pub use_paraphrase: bool,
    /// Collapse runs of the same letter (`goooblok` -> `goblok`) before matching.
    pub collapse_repeats: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            use_normalization: true,
            use_fuzzy_matching: true,
            use_paraphrase: false,
            collapse_repeats: false,
        }
    }
}

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matching: MatchingRules,
    pub common_words: CommonWordDefaults,
    pub paraphrase: ParaphraseConfig,
    pub scan: ScanOptions,
}
