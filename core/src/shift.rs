//! Exact matching with a bad-character shift table.
//!
//! This is the single-heuristic Boyer-Moore variant: the window is compared
//! right to left and a mismatch shifts by the table entry of the haystack
//! character under the mismatch. There is no good-suffix rule.

use std::collections::HashMap;

use crate::normalize::{expand_to_word, NormalizationMap};

/// Shift distances for one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadCharTable {
    shifts: HashMap<char, usize>,
    len: usize,
}

impl BadCharTable {
    pub fn new(pattern: &[char]) -> Self {
        let len = pattern.len();
        let mut shifts = HashMap::new();
        // The final character is excluded so every stored distance is >= 1.
        for (idx, &ch) in pattern.iter().enumerate().take(len.saturating_sub(1)) {
            shifts.insert(ch, len - 1 - idx);
        }
        Self { shifts, len }
    }

    pub fn shift(&self, ch: char) -> usize {
        self.shifts.get(&ch).copied().unwrap_or(self.len).max(1)
    }
}

/// Bad-character tables keyed by the exact pattern string.
///
/// Built once per dictionary snapshot and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct BadCharCache {
    tables: HashMap<String, BadCharTable>,
}

impl BadCharCache {
    pub fn build<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tables = HashMap::new();
        for pattern in patterns {
            if !tables.contains_key(pattern) {
                let chars: Vec<char> = pattern.chars().collect();
                tables.insert(pattern.to_string(), BadCharTable::new(&chars));
            }
        }
        Self { tables }
    }

    pub fn get(&self, pattern: &str) -> Option<&BadCharTable> {
        self.tables.get(pattern)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Returns the start index of every non-overlapping hit of `pattern` in `haystack`.
pub fn shift_search(haystack: &[char], pattern: &[char], table: &BadCharTable) -> Vec<usize> {
    let m = pattern.len();
    let mut hits = Vec::new();
    if m == 0 || m > haystack.len() {
        return hits;
    }
    let mut i = 0;
    while i <= haystack.len() - m {
        let mut j = m;
        while j > 0 && haystack[i + j - 1] == pattern[j - 1] {
            j -= 1;
        }
        if j == 0 {
            hits.push(i);
            i += m;
        } else {
            i += table.shift(haystack[i + j - 1]);
        }
    }
    hits
}

/// A hit projected onto the original text and widened to a whole word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordHit {
    pub start: usize,
    pub end: usize,
}

/// Runs the shift search over one prepared haystack.
pub struct ExactMatcher<'a> {
    text: &'a str,
    map: &'a NormalizationMap,
    haystack: Vec<char>,
}

impl<'a> ExactMatcher<'a> {
    pub fn new(text: &'a str, map: &'a NormalizationMap) -> Self {
        Self {
            text,
            map,
            haystack: map.chars(),
        }
    }

    /// Finds `pattern` and reports each hit as the full surface word around it.
    ///
    /// With `common` set, hits whose surface word (in canonical form, via
    /// `canon`) differs from the pattern are discarded: the pattern sits inside
    /// a larger token.
    pub fn find(
        &self,
        pattern: &str,
        table: &BadCharTable,
        common: bool,
        canon: impl Fn(&str) -> String,
    ) -> Vec<WordHit> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut hits = Vec::new();
        for at in shift_search(&self.haystack, &chars, table) {
            let Some((raw_start, raw_end)) = self.map.project(self.text, at, chars.len()) else {
                continue;
            };
            let (start, end) = expand_to_word(self.text, raw_start, raw_end);
            if common && canon(&self.text[start..end]) != pattern {
                continue;
            }
            hits.push(WordHit { start, end });
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, normalize_word};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn search(haystack: &str, pattern: &str) -> Vec<usize> {
        let p = chars(pattern);
        shift_search(&chars(haystack), &p, &BadCharTable::new(&p))
    }

    #[test]
    fn table_excludes_last_character() {
        let table = BadCharTable::new(&chars("anjing"));
        assert_eq!(table.shift('a'), 5);
        assert_eq!(table.shift('n'), 1);
        assert_eq!(table.shift('j'), 3);
        assert_eq!(table.shift('i'), 2);
        assert_eq!(table.shift('g'), 6);
        assert_eq!(table.shift('z'), 6);
    }

    #[test]
    fn finds_every_non_overlapping_hit() {
        assert_eq!(search("dasarkamugoblokdangoblok", "goblok"), vec![9, 18]);
        assert_eq!(search("aaaa", "aa"), vec![0, 2]);
        assert!(search("go", "goblok").is_empty());
        assert!(search("goblok", "").is_empty());
    }

    #[test]
    fn agrees_with_naive_search_on_sample_inputs() {
        let haystack = "babibabibbabiabbabibab";
        let found = search(haystack, "babi");
        for at in &found {
            assert_eq!(&haystack[*at..*at + 4], "babi");
        }
        assert_eq!(found, vec![0, 4, 9, 15]);
    }

    #[test]
    fn cache_deduplicates_patterns() {
        let cache = BadCharCache::build(["babi", "anjing", "babi"]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("anjing").is_some());
        assert!(cache.get("goblok").is_none());
    }

    #[test]
    fn hits_are_reported_as_whole_original_words() {
        let text = "woi 4nj1ngg jangan";
        let map = normalize(text);
        let matcher = ExactMatcher::new(text, &map);
        let table = BadCharTable::new(&chars("anjing"));
        let hits = matcher.find("anjing", &table, false, normalize_word);
        assert_eq!(hits.len(), 1);
        assert_eq!(&text[hits[0].start..hits[0].end], "4nj1ngg");
    }

    #[test]
    fn common_pattern_inside_a_larger_word_is_discarded() {
        let text = "berhati-hati di jalan";
        let map = normalize(text);
        let matcher = ExactMatcher::new(text, &map);
        let table = BadCharTable::new(&chars("hati"));
        let hits = matcher.find("hati", &table, true, normalize_word);
        let words: Vec<&str> = hits.iter().map(|h| &text[h.start..h.end]).collect();
        assert_eq!(words, vec!["hati"]);
    }
}
