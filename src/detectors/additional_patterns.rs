//! Tail end of the PATTERN-tier PII family (§4.7): EMPLOYER, AGE,
//! HEALTH_PLAN_ID, MEMBER_ID, contextual NPI, BANK_ROUTING, EMPLOYEE_ID.
//!
//! Split out from [`super::pii`] because AGE needs a range check
//! (0–120) that does not fit the declarative `PatternDef` table shape.

use super::{run_pattern_table, Detector};
use crate::patterns::ADDITIONAL_PATTERNS;
use crate::types::{Span, Tier};

fn age_in_range(text: &str) -> bool {
    text.trim().parse::<u32>().map(|n| n <= 120).unwrap_or(false)
}

pub struct AdditionalPatternsDetector;

impl AdditionalPatternsDetector {
    pub fn new() -> Self {
        AdditionalPatternsDetector
    }
}

impl Default for AdditionalPatternsDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for AdditionalPatternsDetector {
    fn name(&self) -> &str {
        "additional_patterns"
    }

    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn detect(&self, text: &str) -> Vec<Span> {
        run_pattern_table(text, ADDITIONAL_PATTERNS, self.name(), self.tier())
            .into_iter()
            .filter(|span| span.entity_type != "AGE" || age_in_range(&span.text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_employer_and_age() {
        let d = AdditionalPatternsDetector::new();
        let spans = d.detect("A 45-year-old patient, employed by Acme Corp.");
        assert!(spans.iter().any(|s| s.entity_type == "AGE" && s.text == "45"));
        assert!(spans.iter().any(|s| s.entity_type == "EMPLOYER"));
    }

    #[test]
    fn rejects_out_of_range_age() {
        let d = AdditionalPatternsDetector::new();
        let spans = d.detect("Age: 214");
        assert!(!spans.iter().any(|s| s.entity_type == "AGE"));
    }

    #[test]
    fn detects_health_plan_and_member_id() {
        let d = AdditionalPatternsDetector::new();
        let spans = d.detect("Member ID: ABC123456, plan BCBS-998877");
        assert!(spans.iter().any(|s| s.entity_type == "MEMBER_ID"));
        assert!(spans.iter().any(|s| s.entity_type == "HEALTH_PLAN_ID"));
    }

    #[test]
    fn detects_contextual_npi_and_bank_routing() {
        let d = AdditionalPatternsDetector::new();
        let spans = d.detect("NPI: 1234567893, routing number 021000021");
        assert!(spans.iter().any(|s| s.entity_type == "NPI"));
        assert!(spans.iter().any(|s| s.entity_type == "BANK_ROUTING"));
    }
}
