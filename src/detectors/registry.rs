//! Builds the concrete `Vec<Box<dyn Detector>>` the orchestrator runs, from
//! a [`crate::config::DetectionConfig`]. Explicit and static — no dynamic
//! registration or plugin discovery (§9 REDESIGN FLAG: the source's
//! decorator-based registry is replaced with a plain constructor list).

use super::additional_patterns::AdditionalPatternsDetector;
use super::checksum::ChecksumDetector;
use super::financial::FinancialDetector;
use super::government::GovernmentDetector;
use super::hyperscan::HyperscanDetector;
use super::ml::MlDetector;
use super::pii::PiiDetector;
use super::secrets::SecretsDetector;
use super::Detector;
use crate::config::DetectionConfig;

/// Construct every detector enabled by `config`. An ML model is never
/// instantiated here — the core has no model-loading surface — so
/// `enable_ml` with no model wired in by the caller yields an
/// unavailable, no-op [`MlDetector`] rather than an error.
pub fn build_detectors(config: &DetectionConfig) -> Vec<Box<dyn Detector>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();

    if config.enable_checksum {
        detectors.push(Box::new(ChecksumDetector::new()));
    }
    if config.enable_secrets {
        detectors.push(Box::new(SecretsDetector::new()));
    }
    if config.enable_financial {
        detectors.push(Box::new(FinancialDetector::new()));
    }
    if config.enable_government {
        detectors.push(Box::new(GovernmentDetector::new()));
    }
    if config.enable_patterns {
        detectors.push(Box::new(PiiDetector::new()));
        detectors.push(Box::new(AdditionalPatternsDetector::new()));
    }
    if config.enable_ml {
        detectors.push(Box::new(MlDetector::disabled()));
    }
    if config.enable_hyperscan {
        detectors.push(Box::new(HyperscanDetector::new()));
    }

    detectors.retain(|d| d.is_available());
    detectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_pattern_family_detectors() {
        let detectors = build_detectors(&DetectionConfig::default());
        let names: Vec<&str> = detectors.iter().map(|d| d.name()).collect();
        assert!(names.contains(&"checksum"));
        assert!(names.contains(&"secrets"));
        assert!(names.contains(&"financial"));
        assert!(names.contains(&"government"));
        assert!(names.contains(&"pii"));
        assert!(names.contains(&"additional_patterns"));
        assert!(!names.contains(&"ml"));
    }

    #[test]
    fn ml_without_a_model_is_dropped_as_unavailable() {
        let detectors = build_detectors(&DetectionConfig::full());
        assert!(!detectors.iter().any(|d| d.name() == "ml"));
    }

    #[test]
    fn hyperscan_detector_is_built_only_when_enabled() {
        let without = build_detectors(&DetectionConfig::default());
        assert!(!without.iter().any(|d| d.name() == "hyperscan"));

        let with = build_detectors(&DetectionConfig::full());
        assert!(with.iter().any(|d| d.name() == "hyperscan"));
    }

    #[test]
    fn quick_config_skips_optional_families_that_are_disabled() {
        let config = DetectionConfig {
            enable_checksum: false,
            enable_secrets: false,
            enable_financial: false,
            enable_government: false,
            ..DetectionConfig::quick()
        };
        let detectors = build_detectors(&config);
        let names: Vec<&str> = detectors.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["pii", "additional_patterns"]);
    }
}
