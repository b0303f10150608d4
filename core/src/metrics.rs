//! Detection quality against a ground-truth word list.
//!
//! Detected patterns, ground-truth words and document tokens all pass through
//! [`normalize_word`] first, so `4nj1ng` in the truth list and `anjing` in the
//! dictionary count as the same word. Rates are percentages rounded to two
//! decimals; an empty denominator yields `0`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_word, tokenize};
use crate::Match;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    #[serde(rename = "TP")]
    pub true_positives: usize,
    #[serde(rename = "FP")]
    pub false_positives: usize,
    #[serde(rename = "FN")]
    pub false_negatives: usize,
    #[serde(rename = "TN")]
    pub true_negatives: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn accuracy(&self) -> f64 {
        percent(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        percent(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    pub fn recall(&self) -> f64 {
        percent(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    pub fn f1(&self) -> f64 {
        let precision = ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        );
        let recall = ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        );
        if precision + recall == 0.0 {
            return 0.0;
        }
        round2(200.0 * precision * recall / (precision + recall))
    }
}

/// Confusion matrix plus the derived rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Ground-truth words that were detected, normalized and sorted.
    pub detected_true: Vec<String>,
}

impl From<ConfusionMatrix> for Metrics {
    fn from(confusion: ConfusionMatrix) -> Self {
        Self {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
            detected_true: Vec::new(),
        }
    }
}

/// Scores resolved matches; `None` when no ground truth was supplied.
pub fn score(matches: &[Match], original: &str, ground_truth: &[String]) -> Option<Metrics> {
    if ground_truth.is_empty() {
        return None;
    }
    let detected: BTreeSet<String> = matches
        .iter()
        .map(|m| normalize_word(&m.pattern))
        .filter(|w| !w.is_empty())
        .collect();
    let truth: BTreeSet<String> = ground_truth
        .iter()
        .map(|w| normalize_word(w))
        .filter(|w| !w.is_empty())
        .collect();
    let universe: BTreeSet<String> = tokenize(original)
        .iter()
        .map(|t| normalize_word(t.text))
        .filter(|w| !w.is_empty())
        .collect();

    let true_positives = detected.intersection(&truth).count();
    let confusion = ConfusionMatrix {
        true_positives,
        false_positives: detected.len() - true_positives,
        false_negatives: truth.len() - true_positives,
        true_negatives: universe
            .iter()
            .filter(|w| !truth.contains(*w) && !detected.contains(*w))
            .count(),
    };

    let mut metrics = Metrics::from(confusion);
    metrics.detected_true = detected.intersection(&truth).cloned().collect();
    Some(metrics)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn percent(num: usize, den: usize) -> f64 {
    round2(ratio(num, den) * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detected(pattern: &str) -> Match {
        Match {
            pattern: pattern.into(),
            replacement: String::new(),
            start: 0,
            end: 0,
            raw_word: String::new(),
        }
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn partial_recall() {
        let metrics = score(
            &[detected("anjing")],
            "dasar anjing dan babi",
            &words(&["anjing", "babi"]),
        )
        .unwrap();
        assert_eq!(metrics.confusion.true_positives, 1);
        assert_eq!(metrics.confusion.false_negatives, 1);
        assert_eq!(metrics.confusion.false_positives, 0);
        assert_eq!(metrics.confusion.true_negatives, 2);
        assert_eq!(metrics.recall, 50.0);
        assert_eq!(metrics.precision, 100.0);
        assert_eq!(metrics.f1, 66.67);
        assert_eq!(metrics.accuracy, 75.0);
        assert_eq!(metrics.detected_true, vec!["anjing".to_string()]);
    }

    #[test]
    fn ground_truth_is_normalized() {
        let metrics = score(&[detected("anjing")], "4nj1ng", &words(&["4NJ1NG"])).unwrap();
        assert_eq!(metrics.confusion.true_positives, 1);
        assert_eq!(metrics.confusion.true_negatives, 0);
    }

    #[test]
    fn absent_ground_truth_omits_metrics() {
        assert!(score(&[detected("anjing")], "anjing", &[]).is_none());
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let m = Metrics::from(ConfusionMatrix::default());
        assert_eq!((m.accuracy, m.precision, m.recall, m.f1), (0.0, 0.0, 0.0, 0.0));

        let metrics = score(&[], "", &words(&["babi"])).unwrap();
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    proptest! {
        #[test]
        fn counts_are_complete_and_rates_bounded(
            found in prop::collection::vec("[a-z]{2,6}", 0..8),
            truth in prop::collection::vec("[a-z]{2,6}", 1..8),
            text in "[a-z ]{0,60}",
        ) {
            let matches: Vec<Match> = found.iter().map(|p| detected(p)).collect();
            let metrics = score(&matches, &text, &truth).unwrap();
            let c = metrics.confusion;
            let detected_set: BTreeSet<&String> = found.iter().collect();
            let truth_set: BTreeSet<&String> = truth.iter().collect();
            prop_assert_eq!(c.true_positives + c.false_positives, detected_set.len());
            prop_assert_eq!(c.true_positives + c.false_negatives, truth_set.len());
            for rate in [metrics.accuracy, metrics.precision, metrics.recall, metrics.f1] {
                prop_assert!(!rate.is_nan());
                prop_assert!((0.0..=100.0).contains(&rate));
            }
        }
    }
}
