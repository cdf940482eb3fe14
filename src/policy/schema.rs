//! Policy pack data model (§4.14): trigger predicates, compliance
//! metadata, and the merged result an evaluation produces.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Minimal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCategory {
    Hipaa,
    Ferpa,
    Glba,
    Sox,
    Coppa,
    Ccpa,
    Cpra,
    Nydfs,
    Shield,
    Gdpr,
    Lgpd,
    Pipeda,
    Popia,
    Pdpa,
    PciDss,
    Soc2,
    Iso27001,
    Pii,
    Phi,
    Custom,
}

/// Defines when a policy is triggered (§4.14).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTrigger {
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub combinations: Vec<Vec<String>>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    #[serde(default)]
    pub exclude_if_only: Vec<String>,
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_min_count() -> usize {
    1
}

impl PolicyTrigger {
    pub fn is_empty(&self) -> bool {
        self.any_of.is_empty() && self.all_of.is_empty() && self.combinations.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSubjectRights {
    #[serde(default)]
    pub access: bool,
    #[serde(default)]
    pub rectification: bool,
    #[serde(default)]
    pub erasure: bool,
    #[serde(default)]
    pub portability: bool,
    #[serde(default)]
    pub restriction: bool,
    #[serde(default)]
    pub objection: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_days: Option<i64>,
    pub min_days: Option<i64>,
    pub review_frequency_days: Option<i64>,
    #[serde(default)]
    pub auto_delete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlingRequirements {
    #[serde(default)]
    pub encryption_required: bool,
    #[serde(default)]
    pub encryption_at_rest: bool,
    #[serde(default)]
    pub encryption_in_transit: bool,
    #[serde(default)]
    pub tokenization_required: bool,
    #[serde(default)]
    pub masking_required: bool,
    #[serde(default)]
    pub audit_access: bool,
    #[serde(default)]
    pub access_logging: bool,
    #[serde(default)]
    pub mfa_required: bool,
    #[serde(default)]
    pub geographic_restrictions: Vec<String>,
    #[serde(default)]
    pub prohibited_regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPack {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub category: PolicyCategory,
    #[serde(default = "default_risk_level")]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub triggers: PolicyTrigger,
    #[serde(default)]
    pub special_category_triggers: PolicyTrigger,
    #[serde(default)]
    pub handling: HandlingRequirements,
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub data_subject_rights: DataSubjectRights,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_risk_level() -> RiskLevel {
    RiskLevel::High
}

fn default_true() -> bool {
    true
}

/// An entity that matched during detection, the policy engine's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMatch {
    pub entity_type: String,
    pub value: String,
    pub confidence: f64,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub source: String,
}

impl From<&crate::types::Span> for EntityMatch {
    fn from(span: &crate::types::Span) -> Self {
        EntityMatch {
            entity_type: span.entity_type.clone(),
            value: span.text.clone(),
            confidence: span.confidence,
            start: span.start,
            end: span.end,
            source: span.detector.clone(),
        }
    }
}

/// Details about how a policy was triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyMatch {
    pub policy_name: String,
    pub trigger_type: String,
    pub matched_entities: Vec<String>,
    pub matched_values: Vec<String>,
}

/// Merged result of evaluating all policies against a set of entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyResult {
    pub matches: Vec<PolicyMatch>,
    pub risk_level: RiskLevel,
    pub categories: HashSet<PolicyCategory>,
    pub handling: HandlingRequirements,
    pub retention: RetentionPolicy,
    pub data_subject_rights: DataSubjectRights,
    pub jurisdictions: HashSet<String>,
    pub has_phi: bool,
    pub has_pii: bool,
    pub has_pci: bool,
    pub has_gdpr_special: bool,
}

impl PolicyResult {
    pub fn is_sensitive(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn requires_encryption(&self) -> bool {
        self.handling.encryption_required
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.policy_name.as_str()).collect()
    }
}

/// Per-entity-type tallies built from a detection pass, the engine's
/// working context during evaluation.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    pub entity_types: HashSet<String>,
    pub type_counts: HashMap<String, usize>,
    pub type_max_confidence: HashMap<String, f64>,
    pub entities: Vec<EntityMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_empty_without_conditions() {
        assert!(PolicyTrigger::default().is_empty());
        let t = PolicyTrigger { any_of: vec!["SSN".to_string()], ..Default::default() };
        assert!(!t.is_empty());
    }

    #[test]
    fn entity_match_from_span_carries_provenance() {
        let span = crate::types::Span::new(0, 3, "abc", "SSN", 0.9, "checksum", crate::types::Tier::Checksum);
        let m = EntityMatch::from(&span);
        assert_eq!(m.entity_type, "SSN");
        assert_eq!(m.source, "checksum");
    }
}
