//! Span position validation (§4.13): a pure post-transformation checker
//! run after coref expansion (and anywhere else offsets get rewritten) to
//! catch position bugs before they reach scoring.

use crate::error::ValidationError;
use crate::types::Span;

fn validate_single_span(span: &Span, text: &str, text_len: usize) -> Result<(), ValidationError> {
    if span.start > text_len || span.end > text_len {
        return Err(ValidationError::OutOfBounds { start: span.start, end: span.end, text_len });
    }
    if span.start >= span.end {
        return Err(ValidationError::OutOfBounds { start: span.start, end: span.end, text_len });
    }

    let actual = &text[span.start..span.end];
    if actual.eq_ignore_ascii_case(&span.text) || actual.to_lowercase() == span.text.to_lowercase() {
        return Ok(());
    }

    if actual.chars().count() != span.text.chars().count() {
        return Err(ValidationError::LengthMismatch {
            start: span.start,
            end: span.end,
            expected_len: span.text.chars().count(),
            actual_len: actual.chars().count(),
        });
    }

    tracing::debug!(
        start = span.start,
        end = span.end,
        entity_type = %span.entity_type,
        detector = %span.detector,
        "span text differs from source by case/normalization only"
    );
    Ok(())
}

/// Validate every span's position and content against `text`.
///
/// Strict mode returns the first [`ValidationError`] encountered. Lenient
/// mode (the default used by the orchestrator) silently drops invalid
/// spans and keeps the rest — a length mismatch is always dropped; a
/// content-only mismatch (case/normalization) is logged at debug level
/// and the span is kept.
pub fn validate_span_positions(text: &str, spans: Vec<Span>, strict: bool) -> Result<Vec<Span>, ValidationError> {
    if spans.is_empty() {
        return Ok(spans);
    }
    let text_len = text.len();

    if strict {
        for span in &spans {
            validate_single_span(span, text, text_len)?;
        }
        return Ok(spans);
    }

    let mut valid = Vec::with_capacity(spans.len());
    let mut dropped = 0usize;
    for span in spans {
        match validate_single_span(&span, text, text_len) {
            Ok(()) => valid.push(span),
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, kept = valid.len(), "span validation filtered invalid spans");
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    #[test]
    fn valid_span_passes() {
        let text = "call 555-123-4567";
        let spans = vec![Span::new(5, 17, "555-123-4567", "PHONE", 0.9, "t", Tier::Pattern)];
        let result = validate_span_positions(text, spans, false).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn out_of_bounds_span_is_dropped_in_lenient_mode() {
        let text = "short";
        let spans = vec![Span::new(0, 100, "short but wrong", "NAME", 0.9, "t", Tier::Pattern)];
        let result = validate_span_positions(text, spans, false).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn out_of_bounds_span_errors_in_strict_mode() {
        let text = "short";
        let spans = vec![Span::new(0, 100, "short but wrong", "NAME", 0.9, "t", Tier::Pattern)];
        assert!(validate_span_positions(text, spans, true).is_err());
    }

    #[test]
    fn length_mismatch_is_dropped() {
        let text = "Jane Doe is here";
        let spans = vec![Span::new(0, 4, "Janet", "NAME", 0.9, "t", Tier::Pattern)];
        let result = validate_span_positions(text, spans, false).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn case_only_mismatch_is_kept() {
        let text = "JANE DOE is here";
        let spans = vec![Span::new(0, 8, "Jane Doe", "NAME", 0.9, "t", Tier::Pattern)];
        let result = validate_span_positions(text, spans, false).unwrap();
        assert_eq!(result.len(), 1);
    }
}
