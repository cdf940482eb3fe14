//! The `Detector` trait and the per-family implementations that satisfy it.

pub mod additional_patterns;
pub mod checksum;
pub mod financial;
pub mod government;
pub mod hyperscan;
pub mod ml;
pub mod pii;
pub mod registry;
pub mod secrets;

use crate::types::{Span, Tier};

/// A pluggable source of raw spans. One implementation per detector family
/// (§4.3–§4.8); the orchestrator holds a `Vec<Box<dyn Detector>>` built by
/// [`registry::build_detectors`] from a [`crate::config::DetectionConfig`] —
/// no dynamic registration or reflection (§9 REDESIGN FLAG).
pub trait Detector: Send + Sync {
    /// Stable identifier used for provenance (`Span::detector`) and in
    /// `DetectionResult::detectors_used`.
    fn name(&self) -> &str;

    /// The authority tier every span this detector emits carries.
    fn tier(&self) -> Tier;

    /// Whether this detector can run at all (e.g. an ML detector whose
    /// model directory is configured but failed to load). Detectors that
    /// are always constructible (all pattern-family detectors) return
    /// `true` unconditionally.
    fn is_available(&self) -> bool {
        true
    }

    /// Scan `text` and return every raw span found. Must be a pure function
    /// of `text` — no shared mutable state, matching the concurrency model
    /// in §5.
    fn detect(&self, text: &str) -> Vec<Span>;
}

/// Shared helper: run a family's [`crate::patterns::PatternDef`] table
/// against `text`, honoring capture groups and validators (§4.2 steps 1-4),
/// with pattern-level same-span dedup (higher confidence wins, ties broken
/// by registration order).
pub(crate) fn run_pattern_table(
    text: &str,
    table: &[crate::patterns::PatternDef],
    detector_name: &str,
    tier: Tier,
) -> Vec<Span> {
    use regex::RegexBuilder;
    use std::collections::HashMap;

    let mut by_span: HashMap<(usize, usize), (f64, usize, Span)> = HashMap::new();

    for (order, def) in table.iter().enumerate() {
        let re = match RegexBuilder::new(def.regex)
            .case_insensitive(def.flags.case_insensitive)
            .multi_line(def.flags.multiline)
            .dot_matches_new_line(def.flags.dot_matches_new_line)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(pattern = def.name, error = %e, "invalid regex, skipping pattern");
                continue;
            }
        };

        for caps in re.captures_iter(text) {
            let m = if def.capture_group > 0 {
                match caps.get(def.capture_group) {
                    Some(g) => g,
                    None => continue,
                }
            } else {
                caps.get(0).unwrap()
            };

            let value = m.as_str();
            let mut confidence = def.confidence;

            if let Some(validator) = def.validator {
                if !validator(value) {
                    continue;
                }
            }
            confidence = confidence.min(1.0);

            let span = Span::new(
                m.start(),
                m.end(),
                value,
                def.entity_type,
                confidence,
                detector_name,
                tier,
            );

            let key = (m.start(), m.end());
            match by_span.get(&key) {
                Some((existing_conf, existing_order, _)) if *existing_conf >= confidence && *existing_order <= order => {
                    // existing wins, keep it
                }
                _ => {
                    by_span.insert(key, (confidence, order, span));
                }
            }
        }
    }

    let mut spans: Vec<Span> = by_span.into_values().map(|(_, _, s)| s).collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    spans
}
