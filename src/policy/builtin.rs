//! Built-in policy packs (§4.14): a small, compiled-in starter set
//! covering the regulatory categories named in the taxonomy
//! (HIPAA/GDPR/PCI-DSS/CCPA). Grounded in the source's
//! `load_builtin_policies()`, which loads the same packs from YAML at
//! startup; this core has no file-I/O surface, so they are data here
//! instead, the same way [`crate::types::ENTITY_TAXONOMY`] is.
//!
//! Callers who want different packs build their own `PolicyEngine` and
//! add whatever `PolicyPack`s they need instead of calling
//! [`builtin_policies`].

use super::schema::{
    DataSubjectRights, HandlingRequirements, PolicyCategory, PolicyPack, PolicyTrigger,
    RetentionPolicy, RiskLevel,
};

fn trigger(any_of: &[&str]) -> PolicyTrigger {
    PolicyTrigger { any_of: any_of.iter().map(|s| s.to_string()).collect(), ..Default::default() }
}

pub fn builtin_policies() -> Vec<PolicyPack> {
    vec![
        PolicyPack {
            name: "HIPAA PHI".to_string(),
            version: "1.0".to_string(),
            description: "Protected health information under HIPAA".to_string(),
            category: PolicyCategory::Hipaa,
            risk_level: RiskLevel::Critical,
            triggers: trigger(&["MRN", "DIAGNOSIS", "MEDICATION", "HEALTH_PLAN_ID", "NPI", "DEA", "PROCEDURE", "LAB_TEST"]),
            special_category_triggers: PolicyTrigger::default(),
            handling: HandlingRequirements {
                encryption_required: true,
                encryption_at_rest: true,
                encryption_in_transit: true,
                audit_access: true,
                access_logging: true,
                ..Default::default()
            },
            retention: RetentionPolicy { min_days: Some(2190), ..Default::default() },
            data_subject_rights: DataSubjectRights::default(),
            jurisdictions: vec!["US".to_string()],
            enabled: true,
            priority: 20,
            tags: vec!["health".to_string()],
        },
        PolicyPack {
            name: "GDPR personal data".to_string(),
            version: "1.0".to_string(),
            description: "Personal data under the EU General Data Protection Regulation".to_string(),
            category: PolicyCategory::Gdpr,
            risk_level: RiskLevel::High,
            triggers: trigger(&["NAME", "EMAIL", "PHONE", "ADDRESS", "IP_ADDRESS", "DATE_DOB"]),
            special_category_triggers: trigger(&["DIAGNOSIS", "MEDICATION", "HEALTH_PLAN_ID"]),
            handling: HandlingRequirements { encryption_required: true, ..Default::default() },
            retention: RetentionPolicy::default(),
            data_subject_rights: DataSubjectRights {
                access: true,
                rectification: true,
                erasure: true,
                portability: true,
                restriction: true,
                objection: true,
            },
            jurisdictions: vec!["EU".to_string()],
            enabled: true,
            priority: 15,
            tags: vec!["privacy".to_string()],
        },
        PolicyPack {
            name: "PCI-DSS cardholder data".to_string(),
            version: "1.0".to_string(),
            description: "Payment card data under PCI-DSS".to_string(),
            category: PolicyCategory::PciDss,
            risk_level: RiskLevel::Critical,
            triggers: trigger(&["CREDIT_CARD"]),
            special_category_triggers: PolicyTrigger::default(),
            handling: HandlingRequirements {
                encryption_required: true,
                tokenization_required: true,
                masking_required: true,
                audit_access: true,
                ..Default::default()
            },
            retention: RetentionPolicy::default(),
            data_subject_rights: DataSubjectRights::default(),
            jurisdictions: vec![],
            enabled: true,
            priority: 20,
            tags: vec!["financial".to_string()],
        },
        PolicyPack {
            name: "CCPA personal information".to_string(),
            version: "1.0".to_string(),
            description: "Personal information under the California Consumer Privacy Act".to_string(),
            category: PolicyCategory::Ccpa,
            risk_level: RiskLevel::Medium,
            triggers: trigger(&["NAME", "EMAIL", "PHONE", "ADDRESS", "SSN", "DRIVER_LICENSE"]),
            special_category_triggers: PolicyTrigger::default(),
            handling: HandlingRequirements::default(),
            retention: RetentionPolicy::default(),
            data_subject_rights: DataSubjectRights { access: true, erasure: true, ..Default::default() },
            jurisdictions: vec!["US-CA".to_string()],
            enabled: true,
            priority: 5,
            tags: vec!["privacy".to_string()],
        },
        PolicyPack {
            name: "Credential exposure".to_string(),
            version: "1.0".to_string(),
            description: "Leaked secrets and credentials".to_string(),
            category: PolicyCategory::Soc2,
            risk_level: RiskLevel::Critical,
            triggers: trigger(&[
                "PASSWORD", "API_KEY", "PRIVATE_KEY", "JWT", "AWS_ACCESS_KEY", "AWS_SECRET_KEY",
                "GITHUB_TOKEN", "GITLAB_TOKEN", "SLACK_TOKEN", "STRIPE_KEY", "DATABASE_URL",
            ]),
            special_category_triggers: PolicyTrigger::default(),
            handling: HandlingRequirements { encryption_required: true, audit_access: true, ..Default::default() },
            retention: RetentionPolicy::default(),
            data_subject_rights: DataSubjectRights::default(),
            jurisdictions: vec![],
            enabled: true,
            priority: 25,
            tags: vec!["credentials".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_policies_are_all_enabled_and_named() {
        for policy in builtin_policies() {
            assert!(policy.enabled);
            assert!(!policy.name.is_empty());
            assert!(!policy.triggers.is_empty() || !policy.special_category_triggers.is_empty());
        }
    }

    #[test]
    fn hipaa_pack_requires_encryption_and_audit() {
        let hipaa = builtin_policies().into_iter().find(|p| p.category == PolicyCategory::Hipaa).unwrap();
        assert!(hipaa.handling.encryption_required);
        assert!(hipaa.handling.audit_access);
    }
}
