//! Scan pipeline: canonicalize, match, guard, resolve, redact, score.
//!
//! Every configuration is one [`PipelineFlags`] value run through the same
//! stages. [`Engine`] owns the current dictionary [`Snapshot`] and swaps it
//! whole on reload, so concurrent scans always see a complete dictionary.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dictionary::{CommonWordSource, Snapshot, TermSource};
use crate::error::Result;
use crate::fuzzy::FuzzyMatcher;
use crate::guard;
use crate::metrics::{self, Metrics};
use crate::normalize::{tokenize, Canonicalizer};
use crate::paraphrase::{self, Paraphraser};
use crate::redact::{redact_with_spans, Redaction};
use crate::resolve::resolve;
use crate::shift::ExactMatcher;
use crate::{Config, Match, MatchingRules, ScanOptions};

/// Stage switches for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFlags {
    pub exact: bool,
    pub normalization: bool,
    pub fuzzy: bool,
    /// Apply the false-positive guard.
    pub guard: bool,
    pub collapse_repeats: bool,
    pub paraphrase: bool,
}

impl From<&ScanOptions> for PipelineFlags {
    fn from(options: &ScanOptions) -> Self {
        Self {
            exact: true,
            normalization: options.use_normalization,
            fuzzy: options.use_fuzzy_matching,
            guard: true,
            collapse_repeats: options.collapse_repeats,
            paraphrase: options.use_paraphrase,
        }
    }
}

impl PipelineFlags {
    fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer {
            normalize: self.normalization,
            collapse_repeats: self.collapse_repeats,
        }
    }
}

/// Named matching strategies compared side by side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Shift search over case-folded raw text.
    ExactOnly,
    ExactNormalized,
    /// Raw shift search followed by fuzzy matching of lower-cased tokens.
    ExactFuzzy,
    /// Fuzzy matching of normalized tokens, no shift search.
    FuzzyNormalized,
    /// Fuzzy matching of lower-cased tokens with the guard disabled.
    FuzzyOnly,
    Full,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::ExactOnly,
        Strategy::ExactNormalized,
        Strategy::ExactFuzzy,
        Strategy::FuzzyNormalized,
        Strategy::FuzzyOnly,
        Strategy::Full,
    ];

    /// Flags for this strategy; `options` only contributes repeat collapsing
    /// and, for [`Strategy::Full`], the paraphrase switch.
    pub fn flags(self, options: &ScanOptions) -> PipelineFlags {
        let (exact, normalization, fuzzy, guard) = match self {
            Strategy::ExactOnly => (true, false, false, true),
            Strategy::ExactNormalized => (true, true, false, true),
            Strategy::ExactFuzzy => (true, false, true, true),
            Strategy::FuzzyNormalized => (false, true, true, true),
            Strategy::FuzzyOnly => (false, false, true, false),
            Strategy::Full => (true, true, true, true),
        };
        PipelineFlags {
            exact,
            normalization,
            fuzzy,
            guard,
            collapse_repeats: options.collapse_repeats,
            paraphrase: self == Strategy::Full && options.use_paraphrase,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::ExactOnly => "exact-only",
            Strategy::ExactNormalized => "exact-normalized",
            Strategy::ExactFuzzy => "exact-fuzzy",
            Strategy::FuzzyNormalized => "fuzzy-normalized",
            Strategy::FuzzyOnly => "fuzzy-only",
            Strategy::Full => "full",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown strategy `{s}`"))
    }
}

/// Outcome of one scan. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub original: String,
    pub matches: Vec<Match>,
    /// Text with replacements spliced in.
    pub redacted: String,
    /// `redacted`, or its paraphrase when one was applied.
    pub output: String,
    pub paraphrased: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub duration_ms: f64,
}

impl ScanResult {
    pub fn detected_words(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.pattern.as_str()).collect()
    }

    pub fn replacement_words(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.replacement.as_str()).collect()
    }
}

/// Candidates from the enabled matchers, resolved to non-overlapping matches.
///
/// Shift-search candidates are generated before fuzzy ones, so they win
/// equal-start ties.
pub fn detect(snapshot: &Snapshot, rules: &MatchingRules, text: &str, flags: PipelineFlags) -> Vec<Match> {
    let canon = flags.canonicalizer();
    let mut candidates = Vec::new();

    if flags.exact {
        let map = canon.map(text);
        let matcher = ExactMatcher::new(text, &map);
        for entry in &snapshot.entries {
            let pattern = canon.pattern(&entry.pattern);
            let Some(table) = snapshot.shift_tables.get(&pattern) else {
                continue;
            };
            let is_common = flags.guard && snapshot.common_words.contains(&entry.pattern);
            for hit in matcher.find(&pattern, table, is_common, |w| canon.word(w)) {
                let raw_word = &text[hit.start..hit.end];
                if is_common
                    && !guard::accepts(&canon.word(raw_word), &pattern, true, rules.short_pattern_len)
                {
                    continue;
                }
                candidates.push(Match {
                    pattern: entry.pattern.clone(),
                    replacement: entry.primary_replacement.clone(),
                    start: hit.start,
                    end: hit.end,
                    raw_word: raw_word.to_string(),
                });
            }
        }
    }

    if flags.fuzzy {
        let tokens = tokenize(text);
        FuzzyMatcher::new(&tokens, canon, rules.min_fuzzy_len).extend(
            &snapshot.entries,
            &snapshot.fuzzy_expressions,
            &mut candidates,
            |token, entry| {
                !flags.guard
                    || guard::accepts(
                        &canon.word(token),
                        &canon.pattern(&entry.pattern),
                        snapshot.common_words.contains(&entry.pattern),
                        rules.short_pattern_len,
                    )
            },
        );
    }

    resolve(candidates)
}

/// Owns the dictionary snapshot and the collaborators that feed it.
pub struct Engine {
    config: Config,
    terms: Box<dyn TermSource>,
    common_words: Box<dyn CommonWordSource>,
    paraphraser: Option<Box<dyn Paraphraser>>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Engine {
    /// Loads the first snapshot; fails with
    /// [`Error::DictionaryUnavailable`](crate::Error::DictionaryUnavailable)
    /// when the term source does.
    pub fn new(
        config: Config,
        terms: impl TermSource + 'static,
        common_words: impl CommonWordSource + 'static,
    ) -> Result<Self> {
        let snapshot = load_snapshot(&config, &terms, &common_words)?;
        Ok(Self {
            config,
            terms: Box::new(terms),
            common_words: Box::new(common_words),
            paraphraser: None,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn with_paraphraser(mut self, paraphraser: impl Paraphraser + 'static) -> Self {
        self.paraphraser = Some(Box::new(paraphraser));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Rebuilds the snapshot from the sources and swaps it in.
    ///
    /// On failure the previous snapshot stays active.
    pub fn reload(&self) -> Result<()> {
        let fresh = load_snapshot(&self.config, self.terms.as_ref(), self.common_words.as_ref())?;
        let mut slot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Arc::new(fresh);
        Ok(())
    }

    /// Scans with the configured default options.
    pub fn scan(&self, text: &str, ground_truth: &[String]) -> ScanResult {
        self.scan_with(text, ground_truth, &self.config.scan)
    }

    pub fn scan_with(&self, text: &str, ground_truth: &[String], options: &ScanOptions) -> ScanResult {
        self.run(text, ground_truth, PipelineFlags::from(options))
    }

    pub fn scan_strategy(
        &self,
        text: &str,
        ground_truth: &[String],
        strategy: Strategy,
        options: &ScanOptions,
    ) -> ScanResult {
        self.run(text, ground_truth, strategy.flags(options))
    }

    pub fn run(&self, text: &str, ground_truth: &[String], flags: PipelineFlags) -> ScanResult {
        let started = Instant::now();
        let snapshot = self.snapshot();
        let matches = detect(&snapshot, &self.config.matching, text, flags);
        let Redaction {
            text: redacted,
            replaced,
        } = redact_with_spans(text, &matches);

        let mut output = redacted.clone();
        let mut paraphrased = false;
        if flags.paraphrase && !matches.is_empty() {
            match self.paraphraser.as_deref() {
                Some(paraphraser) => {
                    let spans = paraphrase::sentence_spans(&redacted, &replaced);
                    if let Some(rewritten) = paraphrase::paraphrase_sentences(
                        &redacted,
                        &spans,
                        paraphraser,
                        self.config.paraphrase.max_sentence_chars,
                    ) {
                        output = rewritten;
                        paraphrased = true;
                    }
                }
                None => warn!("paraphrase requested but no paraphraser is configured"),
            }
        }

        let metrics = metrics::score(&matches, text, ground_truth);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            matches = matches.len(),
            normalization = flags.normalization,
            fuzzy = flags.fuzzy,
            paraphrased,
            duration_ms,
            "scan finished"
        );
        ScanResult {
            original: text.to_string(),
            matches,
            redacted,
            output,
            paraphrased,
            metrics,
            duration_ms,
        }
    }

    /// Runs every [`Strategy`] over the same input.
    pub fn compare(&self, text: &str, ground_truth: &[String], options: &ScanOptions) -> Comparison {
        let runs: BTreeMap<Strategy, ScanResult> = Strategy::ALL
            .into_iter()
            .map(|strategy| (strategy, self.scan_strategy(text, ground_truth, strategy, options)))
            .collect();
        Comparison::from_runs(text, runs)
    }
}

fn load_snapshot(
    config: &Config,
    terms: &dyn TermSource,
    common_words: &dyn CommonWordSource,
) -> Result<Snapshot> {
    let snapshot = Snapshot::from_sources(
        terms,
        common_words,
        &config.matching,
        &config.common_words.fallback,
    )?;
    info!(
        terms = snapshot.len(),
        common_words = snapshot.common_words.len(),
        "dictionary loaded"
    );
    Ok(snapshot)
}

/// Detections of one strategy measured against [`Strategy::Full`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    pub matched_count: usize,
    /// Share of the full strategy's words also found here; 100 when the full
    /// strategy found nothing.
    pub match_percentage: f64,
    pub missed_words: Vec<String>,
    pub extra_words: Vec<String>,
}

impl Overlap {
    pub fn between(candidate: &ScanResult, full: &ScanResult) -> Self {
        let found = word_set(candidate);
        let reference = word_set(full);
        let matched_count = found.intersection(&reference).count();
        let match_percentage = if reference.is_empty() {
            100.0
        } else {
            ((matched_count as f64 / reference.len() as f64) * 10_000.0).round() / 100.0
        };
        Self {
            matched_count,
            match_percentage,
            missed_words: reference.difference(&found).cloned().collect(),
            extra_words: found.difference(&reference).cloned().collect(),
        }
    }
}

fn word_set(result: &ScanResult) -> BTreeSet<String> {
    result.matches.iter().map(|m| m.pattern.to_lowercase()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySummary {
    pub duration_ms: f64,
    pub detected_count: usize,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_to_full: Option<Overlap>,
}

/// Side-by-side results of every strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub original: String,
    pub runs: BTreeMap<Strategy, ScanResult>,
    pub summary: BTreeMap<Strategy, StrategySummary>,
}

impl Comparison {
    pub fn from_runs(text: &str, runs: BTreeMap<Strategy, ScanResult>) -> Self {
        let full = runs.get(&Strategy::Full);
        let summary = runs
            .iter()
            .map(|(&strategy, result)| {
                let metrics = result.metrics.as_ref();
                let relative_to_full = match full {
                    Some(full) if strategy != Strategy::Full => Some(Overlap::between(result, full)),
                    _ => None,
                };
                let summary = StrategySummary {
                    duration_ms: result.duration_ms,
                    detected_count: result.matches.len(),
                    accuracy: metrics.map(|m| m.accuracy),
                    precision: metrics.map(|m| m.precision),
                    recall: metrics.map(|m| m.recall),
                    f1: metrics.map(|m| m.f1),
                    relative_to_full,
                };
                (strategy, summary)
            })
            .collect();
        Self {
            original: text.to_string(),
            runs,
            summary,
        }
    }
}
