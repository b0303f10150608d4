//! Keeps the earliest-starting candidates that do not overlap.

use crate::Match;

/// Interval selection by ascending start.
///
/// Equal starts keep discovery order (the sort is stable), so candidates
/// pushed earlier win ties.
pub fn resolve(mut candidates: Vec<Match>) -> Vec<Match> {
    candidates.sort_by_key(|m| m.start);
    let mut resolved = Vec::with_capacity(candidates.len());
    let mut last_end = 0;
    for candidate in candidates {
        if candidate.start >= last_end {
            last_end = candidate.end;
            resolved.push(candidate);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(pattern: &str, start: usize, end: usize) -> Match {
        Match {
            pattern: pattern.into(),
            replacement: format!("<{pattern}>"),
            start,
            end,
            raw_word: String::new(),
        }
    }

    #[test]
    fn earlier_candidate_wins_overlap() {
        let resolved = resolve(vec![candidate("a", 5, 12), candidate("b", 8, 15)]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pattern, "a");
    }

    #[test]
    fn equal_starts_keep_discovery_order() {
        let resolved = resolve(vec![candidate("exact", 3, 9), candidate("fuzzy", 3, 12)]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pattern, "exact");
    }

    #[test]
    fn adjacent_candidates_both_survive() {
        let resolved = resolve(vec![candidate("b", 4, 8), candidate("a", 0, 4)]);
        let order: Vec<&str> = resolved.iter().map(|m| m.pattern.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn resolved_matches_never_overlap(spans in prop::collection::vec((0usize..200, 1usize..20), 0..40)) {
            let candidates = spans
                .into_iter()
                .enumerate()
                .map(|(i, (start, len))| candidate(&i.to_string(), start, start + len))
                .collect();
            let resolved = resolve(candidates);
            for pair in resolved.windows(2) {
                prop_assert!(pair[1].start >= pair[0].end);
            }
        }
    }
}
