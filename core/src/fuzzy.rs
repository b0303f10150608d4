//! Gap-tolerant matching of dictionary patterns against single tokens.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::warn;

use crate::dictionary::TermEntry;
use crate::normalize::{Canonicalizer, Token};
use crate::Match;

/// Builds `\bp.*a.*t.*t.*e.*r.*n\b`, case-insensitive.
///
/// Falls back to a literal whole-word expression when the gapped form cannot
/// be compiled; `None` only if the literal fails as well.
pub fn fuzzy_expression(pattern: &str) -> Option<Regex> {
    let gapped = pattern
        .chars()
        .map(|ch| regex::escape(&ch.to_string()))
        .collect::<Vec<_>>()
        .join(".*");
    match Regex::new(&format!(r"(?i)\b{gapped}\b")) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern, error = %err, "fuzzy expression rejected, using literal match");
            match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(pattern))) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern, error = %err, "literal expression rejected, pattern skipped");
                    None
                }
            }
        }
    }
}

/// Compiled fuzzy expressions keyed by pattern.
#[derive(Debug, Clone, Default)]
pub struct FuzzyCache {
    expressions: HashMap<String, Regex>,
}

impl FuzzyCache {
    pub fn build<'a>(patterns: impl IntoIterator<Item = &'a str>, min_len: usize) -> Self {
        let mut expressions = HashMap::new();
        for pattern in patterns {
            if pattern.chars().count() < min_len || expressions.contains_key(pattern) {
                continue;
            }
            if let Some(regex) = fuzzy_expression(pattern) {
                expressions.insert(pattern.to_string(), regex);
            }
        }
        Self { expressions }
    }

    pub fn get(&self, pattern: &str) -> Option<&Regex> {
        self.expressions.get(pattern)
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

/// Scans tokens not yet claimed by an earlier candidate.
pub struct FuzzyMatcher<'t, 'a> {
    tokens: &'t [Token<'a>],
    canon: Canonicalizer,
    min_len: usize,
}

impl<'t, 'a> FuzzyMatcher<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>], canon: Canonicalizer, min_len: usize) -> Self {
        Self {
            tokens,
            canon,
            min_len,
        }
    }

    /// Appends accepted fuzzy hits to `candidates`.
    ///
    /// `accept` is consulted before a hit is recorded; a rejected hit leaves
    /// the token free for later patterns.
    pub fn extend(
        &self,
        entries: &[TermEntry],
        cache: &FuzzyCache,
        candidates: &mut Vec<Match>,
        accept: impl Fn(&str, &TermEntry) -> bool,
    ) {
        let forms: Vec<String> = self.tokens.iter().map(|t| self.canon.word(t.text)).collect();
        let mut claimed: Vec<bool> = self
            .tokens
            .iter()
            .map(|t| candidates.iter().any(|c| c.start < t.end && t.start < c.end))
            .collect();
        let mut checked: HashSet<(&str, usize)> = HashSet::new();

        for entry in entries {
            let pattern = self.canon.pattern(&entry.pattern);
            let pattern_len = pattern.chars().count();
            if pattern_len < self.min_len {
                continue;
            }
            let Some(regex) = cache.get(&pattern) else {
                continue;
            };
            for (idx, token) in self.tokens.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                if !checked.insert((entry.pattern.as_str(), token.start)) {
                    continue;
                }
                let form = &forms[idx];
                if form.chars().count() < pattern_len || !regex.is_match(form) {
                    continue;
                }
                if !accept(token.text, entry) {
                    continue;
                }
                claimed[idx] = true;
                candidates.push(Match {
                    pattern: entry.pattern.clone(),
                    replacement: entry.primary_replacement.clone(),
                    start: token.start,
                    end: token.end,
                    raw_word: token.text.to_string(),
                });
            }
        }
    }
}
