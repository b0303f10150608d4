//! Splices replacements into the original text.

use crate::Match;

/// Redacted text plus the byte span each replacement occupies in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    pub replaced: Vec<(usize, usize)>,
}

pub fn redact(original: &str, matches: &[Match]) -> String {
    redact_with_spans(original, matches).text
}

/// Output offsets differ from input offsets whenever a replacement is not the
/// same length as the span it replaces; `replaced` is in output coordinates.
pub fn redact_with_spans(original: &str, matches: &[Match]) -> Redaction {
    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by_key(|m| m.start);

    let mut text = String::with_capacity(original.len());
    let mut replaced = Vec::with_capacity(ordered.len());
    let mut cursor = 0;
    for m in ordered {
        if m.start < cursor || !original.is_char_boundary(m.end) {
            continue;
        }
        let Some(before) = original.get(cursor..m.start) else {
            continue;
        };
        text.push_str(before);
        let at = text.len();
        text.push_str(&m.replacement);
        replaced.push((at, text.len()));
        cursor = m.end;
    }
    text.push_str(&original[cursor..]);
    Redaction { text, replaced }
}
