//! ML detector contract (§4.8, tier = ML).
//!
//! The core only commits to an input/output contract; a concrete model is
//! swappable behind [`MlModel`]. [`MlDetector`] owns the chunking, boundary
//! expansion, name trimming, ID false-positive filtering, and cross-chunk
//! dedup every implementation must get for free regardless of which model
//! backs it.

use super::Detector;
use crate::types::{Span, Tier};

const MAX_CHUNK_CHARS: usize = 1500;
const CHUNK_OVERLAP: usize = 200;

/// One raw detection from a model, in chunk-relative char offsets.
#[derive(Debug, Clone)]
pub struct RawMlSpan {
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
    pub confidence: f64,
}

/// Anything that turns a chunk of text into BIO-tag-derived spans. The core
/// never assumes a particular model architecture — only this contract.
pub trait MlModel: Send + Sync {
    fn predict(&self, chunk: &str) -> Vec<RawMlSpan>;
}

/// Closed list of name-particle connectors that should not be trimmed off
/// a `NAME*` span even though they look like ordinary lowercase words.
const NAME_CONNECTORS: &[&str] = &[
    "van", "von", "de", "del", "della", "di", "da", "al", "el", "bin", "ibn",
    "la", "le", "du", "der", "den", "van der", "van den", "mac", "mc", "st",
    "saint", "abu", "bint", "ter", "ten", "vander", "dos", "das", "do",
];

/// Filler words that, once they trail a `NAME*` match, should be trimmed
/// along with everything after them.
const NAME_FILLER: &[&str] = &[
    "the", "is", "was", "were", "appears", "seems", "reported", "stated",
    "said", "told", "who", "that", "which", "and", "with", "at", "in", "on",
    "a", "an", "to", "of", "for", "has", "have", "had", "will", "would",
    "should", "could", "can", "may", "might", "did", "does", "do", "it",
    "this", "these", "those", "also", "then", "but", "or", "so", "because",
    "since", "while", "after", "before", "during",
];

/// Prefix words that mark an `MRN`/`ID`-like token as a product code rather
/// than a patient/record identifier.
const PRODUCT_CODE_PREFIXES: &[&str] = &["SKU", "ITEM", "PART", "LOT", "MODEL", "SERIAL", "CATALOG"];

/// Split `text` into overlapping windows of at most [`MAX_CHUNK_CHARS`]
/// chars with at least [`CHUNK_OVERLAP`] chars of overlap, returning
/// `(char_offset, chunk)` pairs. Breaks preferentially on a paragraph,
/// then sentence, then line, then word boundary near the target length.
fn chunk_text(text: &str) -> Vec<(usize, &str)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.len() <= MAX_CHUNK_CHARS {
        return vec![(0, text)];
    }

    let mut chunks = Vec::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        let target_end = (pos + MAX_CHUNK_CHARS).min(chars.len());
        let end = if target_end == chars.len() {
            target_end
        } else {
            find_break(&chars, pos, target_end)
        };
        let byte_start = chars[pos].0;
        let byte_end = if end < chars.len() { chars[end].0 } else { text.len() };
        chunks.push((byte_start, &text[byte_start..byte_end]));

        if end >= chars.len() {
            break;
        }
        let next_pos = end.saturating_sub(CHUNK_OVERLAP);
        pos = if next_pos > pos { next_pos } else { end };
    }
    chunks
}

/// Search backward from `target_end` for a paragraph, then sentence, then
/// line, then word boundary, falling back to `target_end` itself.
fn find_break(chars: &[(usize, char)], lo: usize, target_end: usize) -> usize {
    let window_lo = lo + MAX_CHUNK_CHARS / 2;
    for i in (window_lo..target_end).rev() {
        if chars[i].1 == '\n' && i + 1 < chars.len() && chars[i + 1].1 == '\n' {
            return i + 1;
        }
    }
    for i in (window_lo..target_end).rev() {
        if matches!(chars[i].1, '.' | '!' | '?') {
            return i + 1;
        }
    }
    for i in (window_lo..target_end).rev() {
        if chars[i].1 == '\n' {
            return i + 1;
        }
    }
    for i in (window_lo..target_end).rev() {
        if chars[i].1.is_whitespace() {
            return i + 1;
        }
    }
    target_end
}

/// Expand `[start, end)` outward to the nearest whitespace so partial
/// tokens are never produced.
fn expand_to_whitespace(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut s = start;
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    while s > 0 {
        let prev = text[..s].chars().next_back();
        match prev {
            Some(c) if !c.is_whitespace() => {
                s -= c.len_utf8();
            }
            _ => break,
        }
    }
    let mut e = end.min(text.len());
    while e < text.len() && !text.is_char_boundary(e) {
        e += 1;
    }
    while e < text.len() {
        let next = text[e..].chars().next();
        match next {
            Some(c) if !c.is_whitespace() => {
                e += c.len_utf8();
            }
            _ => break,
        }
    }
    (s, e)
}

/// Trim trailing connector/filler words and punctuation from a `NAME*`
/// span's text, returning the new end offset (relative to `text`).
fn trim_name_span(text: &str, start: usize, end: usize) -> usize {
    let slice = &text[start..end];
    let words: Vec<&str> = slice.split_whitespace().collect();
    if words.is_empty() {
        return end;
    }

    let mut keep = words.len();
    for (i, w) in words.iter().enumerate().skip(1) {
        let lower = w.to_lowercase();
        let bare: String = lower.chars().filter(|c| c.is_alphanumeric()).collect();
        if is_name_connector(&bare) {
            continue;
        }
        if NAME_FILLER.contains(&bare.as_str()) {
            keep = i;
            break;
        }
    }

    if keep == words.len() {
        let trimmed = slice.trim_end_matches(|c: char| c.is_ascii_punctuation());
        return start + trimmed.len();
    }

    let kept = words[..keep].join(" ");
    let offset = slice.find(&kept).map(|p| p + kept.len()).unwrap_or(kept.len());
    let trimmed_end = start + offset;
    let trimmed = text[start..trimmed_end].trim_end_matches(|c: char| c.is_ascii_punctuation());
    start + trimmed.len()
}

fn is_name_connector(bare_word: &str) -> bool {
    NAME_CONNECTORS.contains(&bare_word)
}

fn is_product_code(prefix_word: &str) -> bool {
    let upper = prefix_word.to_uppercase();
    PRODUCT_CODE_PREFIXES.contains(&upper.as_str())
}

/// Drop `MRN`/`ID`-like spans immediately preceded by a product-code word.
fn filter_product_codes(text: &str, span: &Span) -> bool {
    if span.entity_type != "MRN" && span.entity_type != "ID" {
        return true;
    }
    let before = &text[..span.start];
    match before.split_whitespace().next_back() {
        Some(word) => !is_product_code(word.trim_end_matches(|c: char| !c.is_alphanumeric())),
        None => true,
    }
}

/// Merge spans that overlap across chunk boundaries: same entity type
/// unions into a single span; different entity types keep the
/// higher-confidence one.
fn dedup_cross_chunk(text: &str, mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut() {
            if span.start < last.end {
                if span.entity_type == last.entity_type {
                    let new_start = last.start.min(span.start);
                    let new_end = last.end.max(span.end);
                    *last = Span::new(
                        new_start,
                        new_end,
                        &text[new_start..new_end],
                        last.entity_type.clone(),
                        last.confidence.max(span.confidence),
                        last.detector.clone(),
                        last.tier,
                    );
                    continue;
                } else if span.confidence <= last.confidence {
                    continue;
                } else {
                    merged.pop();
                }
            }
        }
        merged.push(span);
    }
    merged
}

pub struct MlDetector {
    model: Option<Box<dyn MlModel>>,
}

impl MlDetector {
    pub fn new(model: Option<Box<dyn MlModel>>) -> Self {
        MlDetector { model }
    }

    pub fn disabled() -> Self {
        MlDetector { model: None }
    }
}

impl Detector for MlDetector {
    fn name(&self) -> &str {
        "ml"
    }

    fn tier(&self) -> Tier {
        Tier::Ml
    }

    fn is_available(&self) -> bool {
        self.model.is_some()
    }

    fn detect(&self, text: &str) -> Vec<Span> {
        let model = match &self.model {
            Some(m) => m,
            None => return Vec::new(),
        };

        let mut spans = Vec::new();
        for (offset, chunk) in chunk_text(text) {
            for raw in model.predict(chunk) {
                let abs_start = offset + raw.start;
                let abs_end = offset + raw.end;
                let (s, e) = expand_to_whitespace(text, abs_start, abs_end);
                let e = if raw.entity_type.starts_with("NAME") {
                    trim_name_span(text, s, e)
                } else {
                    e
                };
                if e <= s || e > text.len() {
                    continue;
                }
                spans.push(Span::new(
                    s,
                    e,
                    &text[s..e],
                    &raw.entity_type,
                    raw.confidence,
                    self.name(),
                    self.tier(),
                ));
            }
        }

        spans.retain(|span| filter_product_codes(text, span));
        dedup_cross_chunk(text, spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubModel;

    impl MlModel for StubModel {
        fn predict(&self, chunk: &str) -> Vec<RawMlSpan> {
            chunk
                .match_indices("Jordan Rivers")
                .map(|(i, m)| RawMlSpan {
                    start: i,
                    end: i + m.len(),
                    entity_type: "NAME_PATIENT".to_string(),
                    confidence: 0.91,
                })
                .collect()
        }
    }

    #[test]
    fn disabled_without_model() {
        let d = MlDetector::disabled();
        assert!(!d.is_available());
        assert!(d.detect("Jordan Rivers was seen today.").is_empty());
    }

    #[test]
    fn finds_name_with_model() {
        let d = MlDetector::new(Some(Box::new(StubModel)));
        assert!(d.is_available());
        let spans = d.detect("Patient Jordan Rivers arrived on time.");
        assert!(spans.iter().any(|s| s.entity_type == "NAME_PATIENT" && s.text.contains("Jordan Rivers")));
    }

    #[test]
    fn chunking_splits_long_text() {
        let long_text = "word ".repeat(1000);
        let chunks = chunk_text(&long_text);
        assert!(chunks.len() > 1);
        for (_, chunk) in &chunks {
            assert!(chunk.chars().count() <= MAX_CHUNK_CHARS + 1);
        }
    }

    #[test]
    fn product_code_prefix_is_filtered() {
        let text = "SKU ID12345 is out of stock";
        let span = Span::new(4, 11, "ID12345", "ID", 0.7, "ml", Tier::Ml);
        assert!(!filter_product_codes(text, &span));
    }

    #[test]
    fn boundary_expansion_avoids_partial_tokens() {
        let text = "contact Jturner today";
        let (s, e) = expand_to_whitespace(text, 9, 15);
        assert_eq!(&text[s..e], "Jturner");
    }
}
