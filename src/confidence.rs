//! Confidence calibrator (§4.10): remaps each span's raw confidence into
//! its tier's band so a CHECKSUM span never ranks below a PATTERN span
//! with a higher raw score, without touching span identity or offsets.

use crate::types::Span;

/// Calibrate `raw` (expected in `[0, 1]`, clamped otherwise) against
/// `tier`'s floor/ceiling.
pub fn calibrate_confidence(tier: crate::types::Tier, raw: f64) -> f64 {
    let raw = raw.clamp(0.0, 1.0);
    tier.floor() + raw * (tier.ceiling() - tier.floor())
}

/// Calibrate every span in place, leaving start/end/text/entity_type/
/// detector untouched.
pub fn calibrate_spans(spans: Vec<Span>) -> Vec<Span> {
    spans
        .into_iter()
        .map(|mut span| {
            span.confidence = calibrate_confidence(span.tier, span.confidence);
            span
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    #[test]
    fn ml_band_is_zero_to_half() {
        assert_eq!(calibrate_confidence(Tier::Ml, 0.0), 0.0);
        assert_eq!(calibrate_confidence(Tier::Ml, 1.0), 0.50);
    }

    #[test]
    fn checksum_band_is_ninety_to_one() {
        assert_eq!(calibrate_confidence(Tier::Checksum, 0.0), 0.90);
        assert_eq!(calibrate_confidence(Tier::Checksum, 1.0), 1.0);
    }

    #[test]
    fn checksum_floor_beats_pattern_ceiling() {
        let pattern_max = calibrate_confidence(Tier::Pattern, 1.0);
        let checksum_min = calibrate_confidence(Tier::Checksum, 0.0);
        assert!(checksum_min >= pattern_max);
    }

    #[test]
    fn preserves_span_identity() {
        let span = Span::new(3, 9, "abcdef", "SSN", 0.4, "checksum", Tier::Checksum);
        let calibrated = calibrate_spans(vec![span.clone()]);
        assert_eq!(calibrated[0].start, span.start);
        assert_eq!(calibrated[0].end, span.end);
        assert_eq!(calibrated[0].text, span.text);
        assert_ne!(calibrated[0].confidence, span.confidence);
    }

    #[test]
    fn out_of_range_raw_is_clamped() {
        assert_eq!(calibrate_confidence(Tier::Pattern, 1.5), Tier::Pattern.ceiling());
        assert_eq!(calibrate_confidence(Tier::Pattern, -0.5), Tier::Pattern.floor());
    }
}
