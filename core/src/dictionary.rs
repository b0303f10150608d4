//! Term dictionary: source records, canonical entries and the immutable
//! snapshot a scan runs against.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::fuzzy::FuzzyCache;
use crate::guard::CommonWords;
use crate::normalize::{collapse_word, normalize_word};
use crate::shift::BadCharCache;
use crate::MatchingRules;

/// One offensive term as the dictionary source provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub word: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub replacements: Vec<String>,
}

impl TermRecord {
    pub fn new(word: impl Into<String>, replacements: &[&str]) -> Self {
        Self {
            word: word.into(),
            replacements: replacements.iter().map(|r| r.to_string()).collect(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
    })
}

/// Canonical dictionary entry; `pattern` is unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub pattern: String,
    pub primary_replacement: String,
    pub replacements: Vec<String>,
}

/// Supplies offensive terms and their replacements.
pub trait TermSource: Send + Sync {
    fn load_terms(&self) -> Result<Vec<TermRecord>>;
}

/// Supplies words prone to false positives.
pub trait CommonWordSource: Send + Sync {
    fn load_common_words(&self) -> Result<Vec<String>>;
}

/// In-memory source for embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub terms: Vec<TermRecord>,
    pub common_words: Vec<String>,
}

impl StaticSource {
    pub fn new(terms: Vec<TermRecord>, common_words: Vec<String>) -> Self {
        Self {
            terms,
            common_words,
        }
    }
}

impl TermSource for StaticSource {
    fn load_terms(&self) -> Result<Vec<TermRecord>> {
        Ok(self.terms.clone())
    }
}

impl CommonWordSource for StaticSource {
    fn load_common_words(&self) -> Result<Vec<String>> {
        Ok(self.common_words.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DictionaryDocument {
    terms: Vec<TermRecord>,
    common_words: Vec<String>,
}

/// YAML or JSON file with a `terms` list and an optional `common_words` list.
///
/// The file is re-read on every load so a reload picks up edits.
#[derive(Debug, Clone)]
pub struct DictionaryFile {
    path: PathBuf,
}

impl DictionaryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<DictionaryDocument> {
        let text = fs::read_to_string(&self.path).map_err(|source| Error::Source {
            path: self.path.clone(),
            source,
        })?;
        let is_json = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| Error::Parse {
            path: self.path.clone(),
            message,
        })
    }
}

impl TermSource for DictionaryFile {
    fn load_terms(&self) -> Result<Vec<TermRecord>> {
        Ok(self.read()?.terms)
    }
}

impl CommonWordSource for DictionaryFile {
    fn load_common_words(&self) -> Result<Vec<String>> {
        Ok(self.read()?.common_words)
    }
}

/// Normalizes, filters and merges source records in source order.
///
/// A term without replacements stands in for itself.
pub fn build_entries(records: &[TermRecord], rules: &MatchingRules) -> Vec<TermEntry> {
    let mut entries: Vec<TermEntry> = Vec::new();
    let mut by_pattern: HashMap<String, usize> = HashMap::new();
    for record in records {
        let pattern = normalize_word(&record.word);
        if pattern.chars().count() < rules.min_exact_len {
            continue;
        }
        let mut offered: Vec<String> = record
            .replacements
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if offered.is_empty() {
            offered.push(record.word.trim().to_string());
        }
        let idx = *by_pattern.entry(pattern.clone()).or_insert_with(|| {
            entries.push(TermEntry {
                primary_replacement: offered[0].clone(),
                pattern,
                replacements: Vec::new(),
            });
            entries.len() - 1
        });
        let entry = &mut entries[idx];
        for replacement in offered {
            if !entry.replacements.contains(&replacement) {
                entry.replacements.push(replacement);
            }
        }
    }
    entries
}

/// Everything a scan reads: entries, common words and the per-pattern caches.
///
/// Never mutated after construction; a reload builds a new one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entries: Vec<TermEntry>,
    pub common_words: CommonWords,
    pub(crate) shift_tables: BadCharCache,
    pub(crate) fuzzy_expressions: FuzzyCache,
}

impl Snapshot {
    pub fn new(entries: Vec<TermEntry>, common_words: CommonWords, rules: &MatchingRules) -> Self {
        let collapsed: Vec<String> = entries.iter().map(|e| collapse_word(&e.pattern)).collect();
        let patterns = entries
            .iter()
            .map(|e| e.pattern.as_str())
            .chain(collapsed.iter().map(String::as_str));
        let shift_tables = BadCharCache::build(patterns.clone());
        let fuzzy_expressions = FuzzyCache::build(patterns, rules.min_fuzzy_len);
        Self {
            entries,
            common_words,
            shift_tables,
            fuzzy_expressions,
        }
    }

    pub fn from_sources(
        terms: &dyn TermSource,
        common_words: &dyn CommonWordSource,
        rules: &MatchingRules,
        fallback_common: &[String],
    ) -> Result<Self> {
        let records = terms.load_terms().map_err(|err| match err {
            Error::DictionaryUnavailable(_) => err,
            other => Error::DictionaryUnavailable(other.to_string()),
        })?;
        let entries = build_entries(&records, rules);
        let common_words = CommonWords::from_source(common_words.load_common_words(), fallback_common);
        Ok(Self::new(entries, common_words, rules))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl TermSource for FailingSource {
        fn load_terms(&self) -> Result<Vec<TermRecord>> {
            Err(Error::DictionaryUnavailable("store offline".into()))
        }
    }

    impl CommonWordSource for FailingSource {
        fn load_common_words(&self) -> Result<Vec<String>> {
            Err(Error::DictionaryUnavailable("store offline".into()))
        }
    }

    #[test]
    fn merges_terms_that_normalize_alike() {
        let records = vec![
            TermRecord::new("Anjing", &["kurang ajar"]),
            TermRecord::new("4nj1ng", &["kurang ajar", "nakal"]),
            TermRecord::new("babi", &[]),
            TermRecord::new("x", &["y"]),
        ];
        let entries = build_entries(&records, &MatchingRules::default());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pattern, "anjing");
        assert_eq!(entries[0].primary_replacement, "kurang ajar");
        assert_eq!(entries[0].replacements, vec!["kurang ajar", "nakal"]);
        assert_eq!(entries[1].pattern, "babi");
        assert_eq!(entries[1].primary_replacement, "babi");
    }

    #[test]
    fn parses_yaml_with_single_or_listed_replacements() {
        let doc: DictionaryDocument = serde_yaml::from_str(
            "terms:\n  - word: goblok\n    replacements: bodoh\n  - word: anjing\n    replacements: [kurang ajar, nakal]\n  - word: babi\ncommon_words: [hati]\n",
        )
        .unwrap();
        assert_eq!(doc.terms[0].replacements, vec!["bodoh"]);
        assert_eq!(doc.terms[1].replacements.len(), 2);
        assert!(doc.terms[2].replacements.is_empty());
        assert_eq!(doc.common_words, vec!["hati"]);
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let file = DictionaryFile::new("/nonexistent/kata-terms.yml");
        assert!(matches!(file.load_terms(), Err(Error::Source { .. })));
    }

    #[test]
    fn unavailable_terms_fail_the_snapshot() {
        let err = Snapshot::from_sources(&FailingSource, &FailingSource, &MatchingRules::default(), &[])
            .unwrap_err();
        assert!(matches!(err, Error::DictionaryUnavailable(_)));
    }

    #[test]
    fn unavailable_common_words_fall_back() {
        let terms = StaticSource::new(vec![TermRecord::new("goblok", &["bodoh"])], Vec::new());
        let snapshot = Snapshot::from_sources(
            &terms,
            &FailingSource,
            &MatchingRules::default(),
            &["hati".to_string()],
        )
        .unwrap();
        assert!(snapshot.common_words.contains("hati"));
        assert!(snapshot.shift_tables.get("goblok").is_some());
        assert!(snapshot.fuzzy_expressions.get("goblok").is_some());
    }
}
