//! False-positive guard and the common-word exception set.

use std::collections::HashSet;

use tracing::warn;

use crate::normalize::normalize_word;

/// Built-in fallback used when the common-word source is empty or fails.
pub const DEFAULT_COMMON_WORDS: &[&str] = &[
    "kasian", "sia", "ti", "menye", "item", "bodo", "hati", "nakal", "makan", "tidak", "pasang",
    "kasih",
];

/// Normalized tokens that collide with legitimate words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonWords {
    words: HashSet<String>,
}

impl CommonWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| normalize_word(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Resolves a source result, falling back to `fallback` on error or when
    /// nothing usable came back.
    pub fn from_source<E: std::fmt::Display>(
        loaded: Result<Vec<String>, E>,
        fallback: &[String],
    ) -> Self {
        match loaded {
            Ok(words) => {
                let set = Self::new(words);
                if set.is_empty() {
                    warn!("common-word source returned nothing usable, using fallback list");
                    Self::new(fallback)
                } else {
                    set
                }
            }
            Err(err) => {
                warn!(error = %err, "common-word source failed, using fallback list");
                Self::new(fallback)
            }
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.words.contains(pattern)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Decides whether a hit of `pattern` on a token whose canonical form is
/// `token_form` may be kept.
///
/// Common-word patterns and patterns of at most `short_len` characters are
/// only trusted on exact equality.
pub fn verify(token_form: &str, pattern: &str, common: &CommonWords, short_len: usize) -> bool {
    accepts(token_form, pattern, common.contains(pattern), short_len)
}

/// [`verify`] with the common-word lookup already done, for callers whose
/// comparison form of the pattern differs from its dictionary form.
pub fn accepts(token_form: &str, pattern_form: &str, is_common: bool, short_len: usize) -> bool {
    if is_common && token_form != pattern_form {
        return false;
    }
    if pattern_form.chars().count() <= short_len && token_form != pattern_form {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        DEFAULT_COMMON_WORDS.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn normalizes_source_words() {
        let set = CommonWords::new(["H4ti", "  ", "Kasih!"]);
        assert!(set.contains("hati"));
        assert!(set.contains("kasih"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn falls_back_on_error_or_empty() {
        let failed: Result<Vec<String>, String> = Err("connection refused".into());
        let set = CommonWords::from_source(failed, &defaults());
        assert_eq!(set.len(), DEFAULT_COMMON_WORDS.len());

        let empty: Result<Vec<String>, String> = Ok(vec!["2-2".into()]);
        let set = CommonWords::from_source(empty, &defaults());
        assert!(set.contains("tidak"));

        let loaded: Result<Vec<String>, String> = Ok(vec!["jalan".into()]);
        let set = CommonWords::from_source(loaded, &defaults());
        assert!(set.contains("jalan"));
        assert!(!set.contains("tidak"));
    }

    #[test]
    fn common_pattern_requires_exact_token() {
        let set = CommonWords::new(["hati"]);
        assert!(verify("hati", "hati", &set, 2));
        assert!(!verify("berhati", "hati", &set, 2));
    }

    #[test]
    fn short_pattern_requires_exact_token() {
        let set = CommonWords::default();
        assert!(verify("ti", "ti", &set, 2));
        assert!(!verify("tidak", "ti", &set, 2));
        assert!(verify("anjingg", "anjing", &set, 2));
    }
}
