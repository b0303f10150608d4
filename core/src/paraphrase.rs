//! Optional rewrite of redacted sentences by a remote paraphrasing service.
//!
//! Any failure leaves the redacted text as it was; callers only learn whether
//! a paraphrase was applied.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ParaphraseError;
use crate::ParaphraseConfig;

/// Rewrites one sentence.
pub trait Paraphraser: Send + Sync {
    fn paraphrase(&self, sentence: &str) -> Result<String, ParaphraseError>;
}

#[derive(Debug, Serialize)]
struct ParaphraseRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ParaphraseResponse {
    result: Option<String>,
}

/// `POST {endpoint}/paraphrase` with `{"text": ...}`, expecting `{"result": ...}`.
pub struct HttpParaphraser {
    client: reqwest::blocking::Client,
    url: String,
    max_chars: usize,
}

impl HttpParaphraser {
    pub fn new(config: &ParaphraseConfig) -> Result<Self, ParaphraseError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ParaphraseError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/paraphrase", config.endpoint.trim_end_matches('/')),
            max_chars: config.max_sentence_chars,
        })
    }
}

impl Paraphraser for HttpParaphraser {
    fn paraphrase(&self, sentence: &str) -> Result<String, ParaphraseError> {
        let len = sentence.chars().count();
        if len > self.max_chars {
            return Err(ParaphraseError::TooLong {
                len,
                max: self.max_chars,
            });
        }
        debug!(url = %self.url, len, "requesting paraphrase");
        let response = self
            .client
            .post(&self.url)
            .json(&ParaphraseRequest { text: sentence })
            .send()
            .map_err(|e| ParaphraseError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParaphraseError::Status(status.as_u16()));
        }
        let body: ParaphraseResponse = response
            .json()
            .map_err(|e| ParaphraseError::Transport(e.to_string()))?;
        body.result
            .filter(|r| !r.trim().is_empty())
            .ok_or(ParaphraseError::MissingResult)
    }
}

/// Sentence spans around each replaced span, merged where they overlap.
///
/// A sentence runs from just after the previous `.` to just after the next
/// one, or to the text edges.
pub fn sentence_spans(text: &str, replaced: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = replaced
        .iter()
        .filter(|(start, end)| start <= end && *end <= text.len())
        .map(|&(start, end)| {
            let from = text[..start].rfind('.').map_or(0, |dot| dot + 1);
            let to = text[end..].find('.').map_or(text.len(), |dot| end + dot + 1);
            (from, to)
        })
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Replaces each sentence with its paraphrase.
///
/// Sentences longer than `max_chars` characters are left as they are. Returns
/// `None` when nothing was paraphrased or any request failed.
pub fn paraphrase_sentences(
    text: &str,
    spans: &[(usize, usize)],
    paraphraser: &dyn Paraphraser,
    max_chars: usize,
) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut applied = 0;
    for &(start, end) in spans {
        let sentence = text.get(start..end)?;
        out.push_str(text.get(cursor..start)?);
        cursor = end;
        if sentence.chars().count() > max_chars {
            debug!(len = sentence.len(), "sentence too long to paraphrase, kept as is");
            out.push_str(sentence);
            continue;
        }
        match paraphraser.paraphrase(sentence) {
            Ok(rewritten) => {
                out.push_str(&rewritten);
                applied += 1;
            }
            Err(err) => {
                warn!(error = %err, "paraphrase failed, keeping redacted text");
                return None;
            }
        }
    }
    out.push_str(text.get(cursor..)?);
    (applied > 0).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Paraphraser for Upper {
        fn paraphrase(&self, sentence: &str) -> Result<String, ParaphraseError> {
            Ok(sentence.to_uppercase())
        }
    }

    struct Down;

    impl Paraphraser for Down {
        fn paraphrase(&self, _: &str) -> Result<String, ParaphraseError> {
            Err(ParaphraseError::Status(503))
        }
    }

    #[test]
    fn sentence_bounds_follow_periods() {
        let text = "Halo semua. Kamu bodoh sekali. Pergi!";
        let at = text.find("bodoh").unwrap();
        let spans = sentence_spans(text, &[(at, at + 5)]);
        assert_eq!(spans, vec![(11, 30)]);
        assert_eq!(&text[11..30], " Kamu bodoh sekali.");
    }

    #[test]
    fn spans_in_one_sentence_merge() {
        let text = "kamu bodoh dan kurang ajar";
        let spans = sentence_spans(text, &[(5, 10), (15, 26)]);
        assert_eq!(spans, vec![(0, text.len())]);
    }

    #[test]
    fn rewrites_only_the_marked_sentences() {
        let text = "Halo. kamu bodoh. Dah.";
        let out = paraphrase_sentences(text, &[(5, 17)], &Upper, 500).unwrap();
        assert_eq!(out, "Halo. KAMU BODOH. Dah.");
    }

    #[test]
    fn failure_falls_back_to_redacted_text() {
        let text = "kamu bodoh.";
        assert!(paraphrase_sentences(text, &[(0, text.len())], &Down, 500).is_none());
    }

    #[test]
    fn long_sentences_are_skipped() {
        let text = "kamu bodoh sekali.";
        assert!(paraphrase_sentences(text, &[(0, text.len())], &Upper, 5).is_none());
    }

    #[test]
    fn http_client_rejects_oversized_text_before_sending() {
        let client = HttpParaphraser::new(&ParaphraseConfig {
            endpoint: "http://127.0.0.1:9".into(),
            timeout_ms: 50,
            max_sentence_chars: 4,
        })
        .unwrap();
        assert!(matches!(
            client.paraphrase("terlalu panjang"),
            Err(ParaphraseError::TooLong { len: 15, max: 4 })
        ));
    }
}
