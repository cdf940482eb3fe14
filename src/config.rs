//! Detection configuration, mirroring `detectors/config.py`'s frozen
//! dataclass and its named presets.

use serde::{Deserialize, Serialize};

/// Options recognized by [`crate::orchestrator::detect`] (spec.md §6).
///
/// Immutability here is structural: callers build one, pass it by reference
/// or by value, and nothing in the pipeline mutates it. Rust doesn't need
/// the source's `frozen=True` dataclass trick for that guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub enable_checksum: bool,
    pub enable_secrets: bool,
    pub enable_financial: bool,
    pub enable_government: bool,
    pub enable_patterns: bool,
    /// Adds the `aho-corasick`-backed literal pre-filter detector
    /// (§9 REDESIGN FLAG) alongside whichever families above are enabled.
    pub enable_hyperscan: bool,
    pub enable_ml: bool,
    pub ml_model_dir: Option<String>,
    pub enable_coref: bool,
    pub enable_context_enhancement: bool,
    pub enable_policy: bool,
    pub confidence_threshold: f64,
    pub max_workers: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            enable_checksum: true,
            enable_secrets: true,
            enable_financial: true,
            enable_government: true,
            enable_patterns: true,
            enable_hyperscan: false,
            enable_ml: false,
            ml_model_dir: None,
            enable_coref: false,
            enable_context_enhancement: false,
            enable_policy: true,
            confidence_threshold: 0.70,
            max_workers: 4,
        }
    }
}

impl DetectionConfig {
    /// Every optional stage enabled: hyperscan, ML, coref, context
    /// enhancement, policy.
    pub fn full() -> Self {
        DetectionConfig {
            enable_hyperscan: true,
            enable_ml: true,
            enable_coref: true,
            enable_context_enhancement: true,
            enable_policy: true,
            ..Default::default()
        }
    }

    /// Only the pattern-family detectors, nothing ML or coref.
    pub fn patterns_only() -> Self {
        Self::default()
    }

    /// Fast path: pattern detectors only, ML/coref/context-enhancement
    /// explicitly disabled even if a future default changes.
    pub fn quick() -> Self {
        DetectionConfig {
            enable_ml: false,
            enable_coref: false,
            enable_context_enhancement: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_patterns_only() {
        let d = DetectionConfig::default();
        assert!(d.enable_checksum);
        assert!(!d.enable_ml);
        assert_eq!(d.max_workers, 4);
    }

    #[test]
    fn full_enables_everything_optional() {
        let f = DetectionConfig::full();
        assert!(f.enable_hyperscan);
        assert!(f.enable_ml);
        assert!(f.enable_coref);
        assert!(f.enable_context_enhancement);
    }

    #[test]
    fn quick_disables_optional_stages() {
        let q = DetectionConfig::quick();
        assert!(!q.enable_ml);
        assert!(!q.enable_coref);
        assert!(!q.enable_context_enhancement);
    }
}
