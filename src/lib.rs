//! Sensitive-data detection and risk-scoring engine.
//!
//! Given a block of text, [`detect`] runs a tiered family of detectors
//! (checksum validators, high-confidence secret patterns, financial
//! identifiers, government markings, general PII, and an ML contract
//! surface), reconciles overlapping spans, links coreferent name mentions,
//! and optionally evaluates declarative compliance policy packs. [`score`]
//! turns a detection's entity counts into a 0-100 risk score and tier.
//!
//! Out of scope: extracting text from binary documents, OCR, file I/O,
//! network/database/queue plumbing, and ML model training — this crate
//! consumes already-extracted text and exposes a pure library surface.

pub mod config;
pub mod confidence;
pub mod coref;
pub mod detectors;
pub mod entity_resolver;
pub mod error;
pub mod orchestrator;
pub mod patterns;
pub mod policy;
pub mod scoring;
pub mod span_resolver;
pub mod span_validation;
pub mod types;
pub mod validators;

pub use config::DetectionConfig;
pub use entity_resolver::{resolve_entities, Entity};
pub use error::{ConfigurationError, DetectionError, DetectorFailure, ScoringError, ValidationError};
pub use orchestrator::detect;
pub use policy::engine::PolicyEngine;
pub use policy::schema::{PolicyPack, PolicyResult, RiskLevel};
pub use scoring::score;
pub use types::{DetectionResult, ExposureLevel, RiskTier, ScoringResult, Span, Tier};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_detect_and_score() {
        let result = detect("Patient SSN is 078-05-1120.", &DetectionConfig::default());
        assert!(!result.spans.is_empty());

        let mut mean_confidence = std::collections::HashMap::new();
        for (entity_type, count) in &result.entity_counts {
            let confidences: Vec<f64> = result
                .spans
                .iter()
                .filter(|s| &s.entity_type == entity_type)
                .map(|s| s.confidence)
                .collect();
            mean_confidence.insert(entity_type.clone(), confidences.iter().sum::<f64>() / *count as f64);
        }

        let scoring = score(&result.entity_counts, &mean_confidence, ExposureLevel::Private);
        assert!(scoring.score > 0);
    }
}
