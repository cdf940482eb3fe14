//! Generic PII detector (§4.7): phones, emails, IPs, names with credential
//! suffixes, addresses, ZIP, facility names — with deny-list false-positive
//! filtering.

use super::{run_pattern_table, Detector};
use crate::patterns::{NAME_DENY_LIST, PII_PATTERNS};
use crate::types::{Span, Tier};

fn is_denied(text: &str) -> bool {
    let upper = text.to_uppercase();
    NAME_DENY_LIST.iter().any(|denied| upper == *denied || upper.contains(denied))
}

pub struct PiiDetector;

impl PiiDetector {
    pub fn new() -> Self {
        PiiDetector
    }
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PiiDetector {
    fn name(&self) -> &str {
        "pii"
    }

    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn detect(&self, text: &str) -> Vec<Span> {
        run_pattern_table(text, PII_PATTERNS, self.name(), self.tier())
            .into_iter()
            .filter(|span| !is_denied(&span.text))
            .collect::<Vec<Span>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_and_phone() {
        let d = PiiDetector::new();
        let spans = d.detect("Contact Dr. Jane Smith at 555-123-4567 or jane@acme.com");
        assert!(spans.iter().any(|s| s.entity_type == "EMAIL" && s.text == "jane@acme.com"));
        assert!(spans.iter().any(|s| s.entity_type == "PHONE"));
    }

    #[test]
    fn deny_list_filters_common_phrases() {
        let d = PiiDetector::new();
        let spans = d.detect("See the LABORATORY REPORT for details.");
        assert!(!spans.iter().any(|s| s.text.to_uppercase().contains("LABORATORY")));
    }

    #[test]
    fn name_with_credential_suffix() {
        let d = PiiDetector::new();
        let spans = d.detect("Seen by John Carter, MD last week.");
        assert!(spans.iter().any(|s| s.entity_type == "NAME_PROVIDER"));
    }
}
