//! PATTERN-tier government classification detector (§4.6).
//!
//! The bare word `SECRET` is ambiguous with ordinary English; it only
//! qualifies as `CLASSIFICATION_LEVEL` when a term from the classification
//! vocabulary appears within ±50 characters.

use super::{run_pattern_table, Detector};
use crate::patterns::{GOVERNMENT_PATTERNS, SECRET_CONTEXT_VOCABULARY};
use crate::types::{Span, Tier};

const CONTEXT_WINDOW: usize = 50;

fn has_classification_context(text: &str, start: usize, end: usize) -> bool {
    let window_start = start.saturating_sub(CONTEXT_WINDOW);
    let window_end = (end + CONTEXT_WINDOW).min(text.len());
    // byte windows may land mid-char; widen to the nearest char boundary.
    let window_start = (0..=window_start).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    let window_end = (window_end..=text.len()).find(|&i| text.is_char_boundary(i)).unwrap_or(text.len());
    let window = text[window_start..window_end].to_lowercase();
    SECRET_CONTEXT_VOCABULARY.iter().any(|term| window.contains(term))
}

pub struct GovernmentDetector;

impl GovernmentDetector {
    pub fn new() -> Self {
        GovernmentDetector
    }
}

impl Default for GovernmentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for GovernmentDetector {
    fn name(&self) -> &str {
        "government"
    }

    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn detect(&self, text: &str) -> Vec<Span> {
        run_pattern_table(text, GOVERNMENT_PATTERNS, self.name(), self.tier())
            .into_iter()
            .filter(|span| {
                span.entity_type != "CLASSIFICATION_LEVEL"
                    || has_classification_context(text, span.start, span.end)
            })
            .collect::<Vec<Span>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_secret_without_context_is_dropped() {
        let d = GovernmentDetector::new();
        let spans = d.detect("Keep this a secret between us, it's not classified");
        // "secret" here is lowercase so the pattern (case-sensitive SECRET) won't match;
        // verify the uppercase bare-word case with no nearby vocabulary is dropped instead.
        let spans2 = d.detect("The SECRET ingredient is cinnamon.");
        assert!(!spans2.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
        assert!(spans.is_empty() || !spans.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
    }

    #[test]
    fn bare_secret_with_context_is_kept() {
        let d = GovernmentDetector::new();
        let spans = d.detect("This document requires SECRET clearance to access.");
        assert!(spans.iter().any(|s| s.entity_type == "CLASSIFICATION_LEVEL"));
    }

    #[test]
    fn full_marking_detected_directly() {
        let d = GovernmentDetector::new();
        let spans = d.detect("Marked TOP SECRET//SCI for distribution.");
        assert!(spans.iter().any(|s| s.entity_type == "CLASSIFICATION_MARKING"));
    }
}
