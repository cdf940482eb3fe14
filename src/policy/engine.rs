//! Policy evaluation engine (§4.14): matches a set of detected entities
//! against a collection of policy packs and merges everything that fires
//! into one [`PolicyResult`].

use super::schema::{
    EntityMatch, EvaluationContext, PolicyCategory, PolicyMatch, PolicyPack, PolicyResult,
    PolicyTrigger, RiskLevel,
};
use std::collections::{HashMap, HashSet};

fn risk_order(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::Minimal => 0,
        RiskLevel::Low => 1,
        RiskLevel::Medium => 2,
        RiskLevel::High => 3,
        RiskLevel::Critical => 4,
    }
}

/// Holds the loaded policy packs and evaluates entities against them.
/// Stateless per-call (no interior mutability needed beyond the pack
/// list), so a single instance can be shared across concurrent `detect`
/// calls behind a shared reference.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    policies: Vec<PolicyPack>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        PolicyEngine::default()
    }

    /// A `PolicyEngine` preloaded with [`super::builtin::builtin_policies`].
    pub fn with_builtin_policies() -> Self {
        let mut engine = PolicyEngine::default();
        engine.add_policies(super::builtin::builtin_policies());
        engine
    }

    pub fn add_policy(&mut self, policy: PolicyPack) {
        if !policy.enabled {
            tracing::debug!(policy = %policy.name, "skipping disabled policy");
            return;
        }
        self.policies.push(policy);
        self.policies.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn add_policies(&mut self, policies: impl IntoIterator<Item = PolicyPack>) {
        for policy in policies {
            self.add_policy(policy);
        }
    }

    pub fn remove_policy(&mut self, name: &str) -> bool {
        let before = self.policies.len();
        self.policies.retain(|p| p.name != name);
        self.policies.len() != before
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name.as_str()).collect()
    }

    /// Evaluate `entities` against every loaded policy, returning the
    /// merged result. Entities below `min_confidence` are ignored entirely.
    pub fn evaluate(&self, entities: &[EntityMatch], min_confidence: f64) -> PolicyResult {
        let ctx = build_context(entities, min_confidence);
        if ctx.entity_types.is_empty() {
            return PolicyResult::default();
        }

        let mut result = PolicyResult::default();
        for policy in &self.policies {
            if let Some(m) = evaluate_policy(policy, &ctx) {
                result.matches.push(m);
                merge_policy_into_result(policy, &mut result);
            }
        }

        result.has_phi = result.categories.contains(&PolicyCategory::Hipaa)
            || result.categories.contains(&PolicyCategory::Phi);
        result.has_pii = result.categories.contains(&PolicyCategory::Pii);
        result.has_pci = result.categories.contains(&PolicyCategory::PciDss);
        result.has_gdpr_special = result.matches.iter().any(|m| m.trigger_type == "special_category");

        result
    }
}

fn build_context(entities: &[EntityMatch], min_confidence: f64) -> EvaluationContext {
    let mut ctx = EvaluationContext::default();
    for entity in entities {
        if entity.confidence < min_confidence {
            continue;
        }
        let etype = entity.entity_type.to_lowercase();
        ctx.entity_types.insert(etype.clone());
        *ctx.type_counts.entry(etype.clone()).or_insert(0) += 1;
        let max_conf = ctx.type_max_confidence.entry(etype).or_insert(0.0);
        if entity.confidence > *max_conf {
            *max_conf = entity.confidence;
        }
        ctx.entities.push(entity.clone());
    }
    ctx
}

fn redact(value: &str) -> String {
    let len = value.chars().count();
    if len > 4 {
        let chars: Vec<char> = value.chars().collect();
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[len - 2..].iter().collect();
        format!("{}{}{}", head, "*".repeat(len - 4), tail)
    } else {
        "*".repeat(len)
    }
}

fn matched_values(ctx: &EvaluationContext, entity_types: &HashSet<String>) -> Vec<String> {
    ctx.entities
        .iter()
        .filter(|e| entity_types.contains(&e.entity_type.to_lowercase()))
        .take(10)
        .map(|e| format!("{}:{}", e.entity_type, redact(&e.value)))
        .collect()
}

fn confidence_ok(ctx: &EvaluationContext, types: &HashSet<String>, min_confidence: f64) -> bool {
    types.iter().all(|t| *ctx.type_max_confidence.get(t).unwrap_or(&0.0) >= min_confidence)
}

fn count_ok(ctx: &EvaluationContext, types: &HashSet<String>, min_count: usize) -> bool {
    types.iter().all(|t| *ctx.type_counts.get(t).unwrap_or(&0) >= min_count)
}

fn lower_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|t| t.to_lowercase()).collect()
}

fn evaluate_triggers(triggers: &PolicyTrigger, ctx: &EvaluationContext) -> Option<Vec<String>> {
    if !triggers.any_of.is_empty() {
        let any_of = lower_set(&triggers.any_of);
        let matched: HashSet<String> = ctx.entity_types.intersection(&any_of).cloned().collect();
        if !matched.is_empty() {
            return Some(matched.into_iter().collect());
        }
    }
    if !triggers.all_of.is_empty() {
        let all_of = lower_set(&triggers.all_of);
        if all_of.is_subset(&ctx.entity_types) {
            return Some(all_of.into_iter().collect());
        }
    }
    for combination in &triggers.combinations {
        let combo = lower_set(combination);
        if combo.is_subset(&ctx.entity_types) {
            return Some(combo.into_iter().collect());
        }
    }
    None
}

fn evaluate_policy(policy: &PolicyPack, ctx: &EvaluationContext) -> Option<PolicyMatch> {
    let triggers = &policy.triggers;
    if triggers.is_empty() {
        return None;
    }

    if !triggers.exclude_if_only.is_empty() {
        let exclude = lower_set(&triggers.exclude_if_only);
        if !ctx.entity_types.is_empty() && ctx.entity_types.is_subset(&exclude) {
            return None;
        }
    }

    if !triggers.any_of.is_empty() {
        let any_of = lower_set(&triggers.any_of);
        let matched: HashSet<String> = ctx.entity_types.intersection(&any_of).cloned().collect();
        if !matched.is_empty()
            && confidence_ok(ctx, &matched, triggers.min_confidence)
            && count_ok(ctx, &matched, triggers.min_count)
        {
            return Some(PolicyMatch {
                policy_name: policy.name.clone(),
                trigger_type: "any_of".to_string(),
                matched_entities: matched.iter().cloned().collect(),
                matched_values: matched_values(ctx, &matched),
            });
        }
    }

    if !triggers.all_of.is_empty() {
        let all_of = lower_set(&triggers.all_of);
        if all_of.is_subset(&ctx.entity_types) && confidence_ok(ctx, &all_of, triggers.min_confidence) {
            return Some(PolicyMatch {
                policy_name: policy.name.clone(),
                trigger_type: "all_of".to_string(),
                matched_entities: all_of.iter().cloned().collect(),
                matched_values: matched_values(ctx, &all_of),
            });
        }
    }

    for combination in &triggers.combinations {
        let combo = lower_set(combination);
        if combo.is_subset(&ctx.entity_types) && confidence_ok(ctx, &combo, triggers.min_confidence) {
            return Some(PolicyMatch {
                policy_name: policy.name.clone(),
                trigger_type: "combination".to_string(),
                matched_entities: combo.iter().cloned().collect(),
                matched_values: matched_values(ctx, &combo),
            });
        }
    }

    if !policy.special_category_triggers.is_empty() {
        if let Some(matched) = evaluate_triggers(&policy.special_category_triggers, ctx) {
            let matched_set: HashSet<String> = matched.iter().cloned().collect();
            return Some(PolicyMatch {
                policy_name: policy.name.clone(),
                trigger_type: "special_category".to_string(),
                matched_entities: matched,
                matched_values: matched_values(ctx, &matched_set),
            });
        }
    }

    None
}

fn merge_policy_into_result(policy: &PolicyPack, result: &mut PolicyResult) {
    result.categories.insert(policy.category);

    if risk_order(policy.risk_level) > risk_order(result.risk_level) {
        result.risk_level = policy.risk_level;
    }

    let ph = &policy.handling;
    let rh = &mut result.handling;
    rh.encryption_required |= ph.encryption_required;
    rh.encryption_at_rest |= ph.encryption_at_rest;
    rh.encryption_in_transit |= ph.encryption_in_transit;
    rh.tokenization_required |= ph.tokenization_required;
    rh.masking_required |= ph.masking_required;
    rh.audit_access |= ph.audit_access;
    rh.access_logging |= ph.access_logging;
    rh.mfa_required |= ph.mfa_required;

    if !ph.geographic_restrictions.is_empty() {
        if rh.geographic_restrictions.is_empty() {
            rh.geographic_restrictions = ph.geographic_restrictions.clone();
        } else {
            let current: HashSet<&String> = rh.geographic_restrictions.iter().collect();
            let incoming: HashSet<&String> = ph.geographic_restrictions.iter().collect();
            rh.geographic_restrictions = current.intersection(&incoming).map(|s| (*s).clone()).collect();
        }
    }

    if !ph.prohibited_regions.is_empty() {
        let mut set: HashSet<String> = rh.prohibited_regions.iter().cloned().collect();
        set.extend(ph.prohibited_regions.iter().cloned());
        rh.prohibited_regions = set.into_iter().collect();
    }

    let pr = &policy.retention;
    let rr = &mut result.retention;
    if let Some(min_days) = pr.min_days {
        if rr.min_days.map_or(true, |current| min_days > current) {
            rr.min_days = Some(min_days);
        }
    }
    if let Some(max_days) = pr.max_days {
        if rr.max_days.map_or(true, |current| max_days < current) {
            rr.max_days = Some(max_days);
        }
    }
    if let Some(freq) = pr.review_frequency_days {
        if rr.review_frequency_days.map_or(true, |current| freq < current) {
            rr.review_frequency_days = Some(freq);
        }
    }

    let pd = &policy.data_subject_rights;
    let rd = &mut result.data_subject_rights;
    rd.access |= pd.access;
    rd.rectification |= pd.rectification;
    rd.erasure |= pd.erasure;
    rd.portability |= pd.portability;
    rd.restriction |= pd.restriction;
    rd.objection |= pd.objection;

    result.jurisdictions.extend(policy.jurisdictions.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hipaa_policy() -> PolicyPack {
        PolicyPack {
            name: "HIPAA PHI".to_string(),
            version: "1.0".to_string(),
            description: String::new(),
            category: PolicyCategory::Hipaa,
            risk_level: RiskLevel::Critical,
            triggers: PolicyTrigger {
                any_of: vec!["MRN".to_string(), "DIAGNOSIS".to_string()],
                ..Default::default()
            },
            special_category_triggers: PolicyTrigger::default(),
            handling: super::super::schema::HandlingRequirements {
                encryption_required: true,
                audit_access: true,
                ..Default::default()
            },
            retention: super::super::schema::RetentionPolicy { min_days: Some(2555), ..Default::default() },
            data_subject_rights: Default::default(),
            jurisdictions: vec!["US".to_string()],
            enabled: true,
            priority: 10,
            tags: vec![],
        }
    }

    fn gdpr_policy() -> PolicyPack {
        PolicyPack {
            name: "GDPR special category".to_string(),
            version: "1.0".to_string(),
            description: String::new(),
            category: PolicyCategory::Gdpr,
            risk_level: RiskLevel::High,
            triggers: PolicyTrigger::default(),
            special_category_triggers: PolicyTrigger {
                any_of: vec!["DIAGNOSIS".to_string()],
                ..Default::default()
            },
            handling: super::super::schema::HandlingRequirements { encryption_required: true, ..Default::default() },
            retention: Default::default(),
            data_subject_rights: super::super::schema::DataSubjectRights { erasure: true, ..Default::default() },
            jurisdictions: vec!["EU".to_string()],
            enabled: true,
            priority: 5,
            tags: vec![],
        }
    }

    fn entity(entity_type: &str, confidence: f64) -> EntityMatch {
        EntityMatch {
            entity_type: entity_type.to_string(),
            value: "sample-value".to_string(),
            confidence,
            start: 0,
            end: 5,
            source: "test".to_string(),
        }
    }

    #[test]
    fn any_of_trigger_fires_and_merges_requirements() {
        let mut engine = PolicyEngine::new();
        engine.add_policy(hipaa_policy());
        let result = engine.evaluate(&[entity("MRN", 0.9)], 0.5);
        assert!(result.is_sensitive());
        assert!(result.requires_encryption());
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.retention.min_days, Some(2555));
        assert!(result.has_phi);
    }

    #[test]
    fn two_policies_merge_risk_level_as_max_and_union_categories() {
        let mut engine = PolicyEngine::new();
        engine.add_policy(hipaa_policy());
        engine.add_policy(gdpr_policy());
        let result = engine.evaluate(&[entity("MRN", 0.9), entity("DIAGNOSIS", 0.95)], 0.5);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.categories.contains(&PolicyCategory::Hipaa));
        assert!(result.categories.contains(&PolicyCategory::Gdpr));
        assert!(result.data_subject_rights.erasure);
        assert!(result.has_gdpr_special);
        assert_eq!(result.jurisdictions.len(), 2);
    }

    #[test]
    fn below_confidence_threshold_entities_are_ignored() {
        let mut engine = PolicyEngine::new();
        engine.add_policy(hipaa_policy());
        let result = engine.evaluate(&[entity("MRN", 0.9)], 0.95);
        assert!(!result.is_sensitive());
    }

    #[test]
    fn no_entities_returns_empty_result() {
        let mut engine = PolicyEngine::new();
        engine.add_policy(hipaa_policy());
        let result = engine.evaluate(&[], 0.5);
        assert!(!result.is_sensitive());
    }
}
