//! Character-level canonicalization with a map back to the original text.
//!
//! The normalized form strips everything except `a-z` after case folding and
//! leetspeak substitution, so it is only ever used as a search haystack. Every
//! kept character records the byte offset it came from, which lets a hit in the
//! haystack be projected back onto the exact original span.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Normalized haystack plus the original byte offset of each of its characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationMap {
    pub normalized: String,
    /// `index_map[i]` is the byte offset in the original text of the character
    /// that produced the `i`-th character of `normalized`.
    pub index_map: Vec<usize>,
}

impl NormalizationMap {
    pub fn chars(&self) -> Vec<char> {
        self.normalized.chars().collect()
    }

    pub fn len(&self) -> usize {
        self.index_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    /// Projects a haystack range `[from, from + len)` onto the original text.
    ///
    /// Returns `None` when the range falls outside the map.
    pub fn project(&self, original: &str, from: usize, len: usize) -> Option<(usize, usize)> {
        if len == 0 {
            return None;
        }
        let start = *self.index_map.get(from)?;
        let last = *self.index_map.get(from + len - 1)?;
        let width = original.get(last..)?.chars().next()?.len_utf8();
        Some((start, last + width))
    }

    /// Drops every character equal to the one kept before it.
    ///
    /// The surviving entry of a run keeps the offset of the run's first
    /// character, so the map stays non-decreasing.
    pub fn collapse_repeats(&self) -> NormalizationMap {
        let mut normalized = String::with_capacity(self.normalized.len());
        let mut index_map = Vec::with_capacity(self.index_map.len());
        let mut previous = None;
        for (ch, &idx) in self.normalized.chars().zip(&self.index_map) {
            if previous == Some(ch) {
                continue;
            }
            previous = Some(ch);
            normalized.push(ch);
            index_map.push(idx);
        }
        NormalizationMap {
            normalized,
            index_map,
        }
    }
}

/// Maps one source character onto the canonical alphabet, or drops it.
fn canonical_letter(ch: char) -> Option<char> {
    let letter = match ch.to_ascii_lowercase() {
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' => 'a',
        '5' => 's',
        '7' => 't',
        other => other,
    };
    letter.is_ascii_lowercase().then_some(letter)
}

pub fn normalize(text: &str) -> NormalizationMap {
    let mut normalized = String::with_capacity(text.len());
    let mut index_map = Vec::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if let Some(letter) = canonical_letter(ch) {
            normalized.push(letter);
            index_map.push(idx);
        }
    }
    NormalizationMap {
        normalized,
        index_map,
    }
}

/// Same table as [`normalize`], applied to a single token.
pub fn normalize_word(token: &str) -> String {
    token.chars().filter_map(canonical_letter).collect()
}

/// Case folding only. Every character is kept, so the raw text is searched as-is.
pub fn fold_case(text: &str) -> NormalizationMap {
    let mut normalized = String::with_capacity(text.len());
    let mut index_map = Vec::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        normalized.push(fold_char(ch));
        index_map.push(idx);
    }
    NormalizationMap {
        normalized,
        index_map,
    }
}

pub fn fold_word(token: &str) -> String {
    token.chars().map(fold_char).collect()
}

// Multi-character lowercase expansions would desynchronize the index map, so
// those characters are kept verbatim.
fn fold_char(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

pub fn collapse_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut previous = None;
    for ch in word.chars() {
        if previous != Some(ch) {
            out.push(ch);
        }
        previous = Some(ch);
    }
    out
}

/// Widens `[start, end)` until both edges sit on a non-alphanumeric boundary.
pub fn expand_to_word(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut start = start.min(text.len());
    let mut end = end.clamp(start, text.len());
    while let Some(prev) = text[..start].chars().next_back() {
        if !prev.is_alphanumeric() {
            break;
        }
        start -= prev.len_utf8();
    }
    while let Some(next) = text[end..].chars().next() {
        if !next.is_alphanumeric() {
            break;
        }
        end += next.len_utf8();
    }
    (start, end)
}

/// A `\w+` token of the original text with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    WORD_RE
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// How text and patterns are brought into a comparable form for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalizer {
    pub normalize: bool,
    pub collapse_repeats: bool,
}

impl Canonicalizer {
    pub fn map(&self, text: &str) -> NormalizationMap {
        let map = if self.normalize {
            normalize(text)
        } else {
            fold_case(text)
        };
        if self.collapse_repeats {
            map.collapse_repeats()
        } else {
            map
        }
    }

    pub fn word(&self, token: &str) -> String {
        let word = if self.normalize {
            normalize_word(token)
        } else {
            fold_word(token)
        };
        if self.collapse_repeats {
            collapse_word(&word)
        } else {
            word
        }
    }

    /// Brings a dictionary pattern into the same form as the haystack.
    pub fn pattern(&self, pattern: &str) -> String {
        if self.collapse_repeats {
            collapse_word(pattern)
        } else {
            pattern.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_leetspeak_and_strips_non_letters() {
        let map = normalize("W0i, 4nj1ng!");
        assert_eq!(map.normalized, "woianjing");
        assert_eq!(map.index_map, vec![0, 1, 2, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn digits_outside_the_table_are_dropped() {
        assert_eq!(normalize_word("b2b"), "bb");
        assert_eq!(normalize_word("98"), "");
    }

    #[test]
    fn non_ascii_letters_are_skipped_but_offsets_stay_exact() {
        let text = "é4b";
        let map = normalize(text);
        assert_eq!(map.normalized, "ab");
        assert_eq!(map.index_map, vec![2, 3]);
        assert_eq!(map.project(text, 0, 2), Some((2, 4)));
    }

    #[test]
    fn projects_multibyte_tail_character() {
        let text = "xÀy";
        let map = fold_case(text);
        assert_eq!(map.normalized, "xày");
        assert_eq!(map.project(text, 1, 1), Some((1, 3)));
    }

    #[test]
    fn expands_hits_to_the_surrounding_word() {
        let text = "kamu berhati-hati ya";
        let (start, end) = expand_to_word(text, 10, 12);
        assert_eq!(&text[start..end], "berhati");
    }

    #[test]
    fn expansion_stays_put_on_boundaries() {
        let text = "a goblok!";
        assert_eq!(expand_to_word(text, 2, 8), (2, 8));
    }

    #[test]
    fn collapse_keeps_first_offset_of_each_run() {
        let map = normalize("goooblok").collapse_repeats();
        assert_eq!(map.normalized, "goblok");
        assert_eq!(map.index_map, vec![0, 1, 4, 5, 6, 7]);
        assert_eq!(collapse_word("goooblokk"), "goblok");
    }

    #[test]
    fn tokenizes_word_runs() {
        let tokens = tokenize("hati-hati di_jalan");
        let words: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(words, vec!["hati", "hati", "di_jalan"]);
        assert_eq!((tokens[1].start, tokens[1].end), (5, 9));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalization_is_idempotent(s in any::<String>()) {
                let once = normalize(&s).normalized;
                let twice = normalize(&once).normalized;
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn index_map_is_monotonic_and_in_bounds(s in any::<String>()) {
                let map = normalize(&s);
                prop_assert_eq!(map.index_map.len(), map.normalized.chars().count());
                prop_assert!(map.index_map.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(map.index_map.iter().all(|&i| s.is_char_boundary(i) && i < s.len()));
            }

            #[test]
            fn word_form_matches_bulk_form(s in "[^\\s]{0,24}") {
                prop_assert_eq!(normalize_word(&s), normalize(&s).normalized);
            }

            #[test]
            fn collapsed_map_stays_non_decreasing(s in "[a-z0-9 ]{0,40}") {
                let map = normalize(&s).collapse_repeats();
                prop_assert_eq!(map.index_map.len(), map.normalized.chars().count());
                prop_assert!(map.index_map.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
