//! Span resolver (§4.11): sorts, deduplicates and merges overlapping spans
//! into the final disjoint (mostly) list handed to the coref expander and
//! scorer.
//!
//! Text reconstruction after a same-type merge re-slices the merge range
//! out of the original input rather than concatenating the two half-texts
//! — the source's concatenation trick assumes the two detectors agree on
//! the overlap text, which isn't guaranteed, so re-slicing against the
//! original string sidesteps that entirely.

use crate::types::{Span, Tier};
use std::cmp::Ordering;

/// Strategy used to break a partial overlap between spans of different
/// entity types (§4.11 step 3e). Default is `HigherConfidence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapStrategy {
    HigherConfidence,
    HigherTier,
    LongerSpan,
}

impl Default for OverlapStrategy {
    fn default() -> Self {
        OverlapStrategy::HigherConfidence
    }
}

fn strategy_winner<'a>(a: &'a Span, b: &'a Span, strategy: OverlapStrategy) -> bool {
    // true => a wins
    match strategy {
        OverlapStrategy::HigherConfidence => a.confidence >= b.confidence,
        OverlapStrategy::HigherTier => a.tier >= b.tier,
        OverlapStrategy::LongerSpan => a.len() >= b.len(),
    }
}

fn merge_same_type(text: &str, left: &Span, right: &Span) -> Span {
    let new_start = left.start.min(right.start);
    let new_end = left.end.max(right.end);
    let (base, other) = if left.tier >= right.tier { (left, right) } else { (right, left) };
    let confidence = left.confidence.max(right.confidence);
    let mut merged = Span::new(
        new_start,
        new_end,
        &text[new_start..new_end],
        base.entity_type.clone(),
        confidence,
        base.detector.clone(),
        base.tier,
    );
    if base.needs_review || other.needs_review {
        let reason = base
            .review_reason
            .clone()
            .or_else(|| other.review_reason.clone())
            .unwrap_or_else(|| "merged span".to_string());
        merged = merged.with_review(reason);
    }
    merged
}

/// Resolve one overlapping pair, returning the single surviving span.
fn resolve_pair(text: &str, tail: Span, incoming: Span, strategy: OverlapStrategy) -> Span {
    if tail.start == incoming.start && tail.end == incoming.end {
        return if tail.tier != incoming.tier {
            if tail.tier > incoming.tier { tail } else { incoming }
        } else if tail.confidence >= incoming.confidence {
            tail
        } else {
            incoming
        };
    }

    if tail.contains(&incoming) {
        return tail;
    }
    if incoming.contains(&tail) {
        return incoming;
    }

    let same_type = tail.entity_type == incoming.entity_type;
    if same_type {
        return merge_same_type(text, &tail, &incoming);
    }

    if strategy_winner(&tail, &incoming, strategy) {
        tail
    } else {
        incoming
    }
}

/// Resolve `spans` (as detected against `text`) into the final sorted,
/// deduplicated list (§4.11).
pub fn resolve_spans(text: &str, mut spans: Vec<Span>, threshold: f64, strategy: OverlapStrategy) -> Vec<Span> {
    spans.retain(|s| s.confidence >= threshold);

    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.tier.cmp(&a.tier))
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
    });

    let mut result: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        let mut incoming = span;
        while let Some(tail) = result.last() {
            if !tail.overlaps(&incoming) {
                break;
            }
            let tail = result.pop().expect("checked by last() above");
            incoming = resolve_pair(text, tail, incoming, strategy);
        }
        result.push(incoming);
    }

    result.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, text: &str, entity_type: &str, confidence: f64, tier: Tier) -> Span {
        Span::new(start, end, text, entity_type, confidence, "test", tier)
    }

    #[test]
    fn drops_spans_below_threshold() {
        let text = "123-45-6789";
        let spans = vec![span(0, 11, text, "SSN", 0.5, Tier::Checksum)];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        assert!(resolved.is_empty());
    }

    #[test]
    fn exact_duplicate_keeps_higher_tier() {
        let text = "foo@bar.com";
        let spans = vec![
            span(0, 11, text, "EMAIL", 0.95, Tier::Pattern),
            span(0, 11, text, "EMAIL", 0.80, Tier::Structured),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].tier, Tier::Structured);
    }

    #[test]
    fn containment_keeps_the_container() {
        let text = "call 555-123-4567 now";
        let spans = vec![
            span(5, 17, "555-123-4567", "PHONE", 0.90, Tier::Pattern),
            span(5, 8, "555", "NUMBER", 0.75, Tier::Pattern),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity_type, "PHONE");
    }

    #[test]
    fn same_type_partial_overlap_merges_and_reslices() {
        let text = "1234 Main Street Suite 5";
        let spans = vec![
            span(0, 16, "1234 Main Street", "ADDRESS", 0.80, Tier::Pattern),
            span(10, 24, "Street Suite 5", "ADDRESS", 0.85, Tier::Pattern),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].start, 0);
        assert_eq!(resolved[0].end, 24);
        assert_eq!(resolved[0].text, text);
        assert_eq!(resolved[0].confidence, 0.85);
    }

    #[test]
    fn different_type_partial_overlap_picks_higher_confidence() {
        let text = "Dr. Jordan handles the case";
        let spans = vec![
            span(0, 10, "Dr. Jordan", "NAME_PROVIDER", 0.92, Tier::Pattern),
            span(4, 15, "Jordan hand", "ORGANIZATION", 0.60, Tier::Pattern),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::HigherConfidence);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity_type, "NAME_PROVIDER");
    }

    #[test]
    fn final_order_is_start_then_descending_end() {
        let text = "aaaa bbbb cccc";
        let spans = vec![
            span(5, 9, "bbbb", "NAME", 0.90, Tier::Pattern),
            span(0, 4, "aaaa", "NAME", 0.90, Tier::Pattern),
            span(10, 14, "cccc", "NAME", 0.90, Tier::Pattern),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        let starts: Vec<usize> = resolved.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 5, 10]);
    }

    #[test]
    fn disjoint_spans_all_survive() {
        let text = "SSN 123-45-6789 and email a@b.com";
        let spans = vec![
            span(4, 15, "123-45-6789", "SSN", 0.95, Tier::Checksum),
            span(26, 34, "a@b.com", "EMAIL", 0.85, Tier::Pattern),
        ];
        let resolved = resolve_spans(text, spans, 0.70, OverlapStrategy::default());
        assert_eq!(resolved.len(), 2);
    }
}
