//! Risk scoring engine (§4.15).
//!
//! content_score = Σ(weight × WEIGHT_SCALE × (1 + ln(count)) × mean_confidence)
//! content_score *= co_occurrence_multiplier   (capped at 2.0)
//! final_score    = clamp(content_score × exposure_multiplier, 0, 100)

use crate::types::{normalize_entity_type, CategoryContribution, ExposureLevel, RiskTier, ScoringResult};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

const WEIGHT_SCALE: f64 = 4.0;
const DEFAULT_WEIGHT: i32 = 5;
const CO_OCCURRENCE_CAP: f64 = 2.0;

static ENTITY_WEIGHTS: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for k in &[
        "SSN", "PASSPORT", "CREDIT_CARD", "PASSWORD", "API_KEY", "PRIVATE_KEY",
        "AWS_ACCESS_KEY", "AWS_SECRET_KEY", "DATABASE_URL", "GITHUB_TOKEN",
        "GITLAB_TOKEN", "SLACK_TOKEN", "STRIPE_KEY", "CRYPTO_SEED_PHRASE",
    ] {
        m.insert(*k, 10);
    }
    m.insert("MRN", 9);
    m.insert("DIAGNOSIS", 9);
    m.insert("HEALTH_PLAN_ID", 9);
    m.insert("JWT", 9);
    m.insert("DRIVER_LICENSE", 8);
    m.insert("NPI", 8);
    m.insert("DEA", 8);
    m.insert("TAX_ID", 8);
    m.insert("MILITARY_ID", 8);
    for k in &["BITCOIN_ADDRESS", "ETHEREUM_ADDRESS", "IBAN", "SWIFT_BIC"] {
        m.insert(*k, 7);
    }
    for k in &["PHONE", "EMAIL", "SENDGRID_KEY", "TWILIO_KEY"] {
        m.insert(*k, 6);
    }
    for k in &[
        "NAME", "NAME_PATIENT", "NAME_PROVIDER", "NAME_RELATIVE", "ADDRESS",
        "IP_ADDRESS", "MAC_ADDRESS", "VIN", "CUSIP", "ISIN", "LEI", "DATE_DOB",
        "MEMBER_ID", "EMPLOYEE_ID", "BANK_ROUTING",
    ] {
        m.insert(*k, 5);
    }
    for k in &[
        "AGE", "CLASSIFICATION_LEVEL", "DOD_CONTRACT", "GSA_CONTRACT",
        "CAGE_CODE", "UEI", "CLASSIFICATION_MARKING", "SCI_MARKING",
        "DISSEMINATION_CONTROL", "ITAR_EAR_MARKING", "CLEARANCE_LEVEL",
    ] {
        m.insert(*k, 4);
    }
    m.insert("DATE", 3);
    m.insert("ZIP", 3);
    for k in &["CITY", "STATE", "COUNTRY", "TRACKING_NUMBER"] {
        m.insert(*k, 2);
    }
    m.insert("FACILITY", 1);
    m.insert("ORGANIZATION", 1);
    m.insert("EMPLOYER", 1);
    m
});

static ENTITY_CATEGORIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for k in &["SSN", "PASSPORT", "DRIVER_LICENSE", "MILITARY_ID", "TAX_ID", "MRN", "STATE_ID"] {
        m.insert(*k, "direct_identifier");
    }
    for k in &["DIAGNOSIS", "MEDICATION", "HEALTH_PLAN_ID", "NPI", "DEA", "LAB_TEST", "PROCEDURE"] {
        m.insert(*k, "health_info");
    }
    for k in &[
        "CREDIT_CARD", "IBAN", "SWIFT_BIC", "ACCOUNT_NUMBER", "CUSIP", "ISIN",
        "BITCOIN_ADDRESS", "ETHEREUM_ADDRESS", "CRYPTO_SEED_PHRASE", "BANK_ROUTING",
    ] {
        m.insert(*k, "financial");
    }
    for k in &["EMAIL", "PHONE", "ADDRESS", "ZIP", "FAX"] {
        m.insert(*k, "contact");
    }
    for k in &[
        "PASSWORD", "API_KEY", "PRIVATE_KEY", "JWT", "AWS_ACCESS_KEY", "AWS_SECRET_KEY",
        "GITHUB_TOKEN", "GITLAB_TOKEN", "SLACK_TOKEN", "STRIPE_KEY", "DATABASE_URL",
    ] {
        m.insert(*k, "credential");
    }
    for k in &["NAME", "NAME_PATIENT", "NAME_PROVIDER", "NAME_RELATIVE", "DATE_DOB", "AGE", "DATE"] {
        m.insert(*k, "quasi_identifier");
    }
    for k in &["CLASSIFICATION_LEVEL", "CLASSIFICATION_MARKING", "SCI_MARKING", "DISSEMINATION_CONTROL"] {
        m.insert(*k, "classification_marking");
    }
    m
});

/// (required_categories, multiplier, rule_name)
static CO_OCCURRENCE_RULES: Lazy<Vec<(Vec<&'static str>, f64, &'static str)>> = Lazy::new(|| {
    vec![
        (vec!["direct_identifier", "health_info"], 2.0, "hipaa_phi"),
        (vec!["direct_identifier", "financial"], 1.8, "identity_theft"),
        (vec!["credential"], 1.5, "credential_exposure"),
        (vec!["quasi_identifier", "health_info"], 1.5, "phi_without_id"),
        (vec!["contact", "health_info"], 1.4, "phi_with_contact"),
        (vec!["direct_identifier", "quasi_identifier", "financial"], 2.2, "full_identity"),
        (vec!["classification_marking"], 2.5, "classified_data"),
    ]
});

fn exposure_multiplier(exposure: ExposureLevel) -> f64 {
    match exposure {
        ExposureLevel::Private => 1.0,
        ExposureLevel::Internal => 1.1,
        ExposureLevel::OrgWide => 1.3,
        ExposureLevel::Public => 1.5,
    }
}

fn weight_of(entity_type: &str) -> i32 {
    let normalized = normalize_entity_type(entity_type);
    *ENTITY_WEIGHTS.get(normalized.as_str()).unwrap_or(&DEFAULT_WEIGHT)
}

fn category_of(entity_type: &str) -> Option<&'static str> {
    let normalized = normalize_entity_type(entity_type);
    ENTITY_CATEGORIES.get(normalized.as_str()).copied()
}

fn categories_present(entity_counts: &HashMap<String, i32>) -> HashSet<&'static str> {
    entity_counts.keys().filter_map(|t| category_of(t)).collect()
}

/// Highest-multiplier co-occurrence rule whose required categories are all
/// present, capped at [`CO_OCCURRENCE_CAP`]. Ties keep the first rule found.
fn co_occurrence_multiplier(entity_counts: &HashMap<String, i32>) -> (f64, Option<&'static str>) {
    if entity_counts.is_empty() {
        return (1.0, None);
    }
    let categories = categories_present(entity_counts);
    let mut best = (1.0, None);
    for (required, mult, rule_name) in CO_OCCURRENCE_RULES.iter() {
        if required.iter().all(|c| categories.contains(c)) && *mult > best.0 {
            best = (*mult, Some(*rule_name));
        }
    }
    (best.0.min(CO_OCCURRENCE_CAP), best.1)
}

/// Score a detection pass's entity counts under a given exposure context.
///
/// `entity_counts` maps normalized entity type to occurrence count;
/// `mean_confidence` maps the same keys to that type's mean calibrated
/// confidence across its spans. Types present in `entity_counts` but absent
/// from `mean_confidence` fall back to a confidence of 1.0.
pub fn score(
    entity_counts: &HashMap<String, i32>,
    mean_confidence: &HashMap<String, f64>,
    exposure: ExposureLevel,
) -> ScoringResult {
    if entity_counts.is_empty() {
        return ScoringResult { score: 0, tier: RiskTier::Minimal, category_breakdown: Vec::new() };
    }

    let mut by_category: HashMap<&'static str, f64> = HashMap::new();
    let mut base_score = 0.0f64;
    for (entity_type, &count) in entity_counts {
        let confidence = mean_confidence.get(entity_type).copied().unwrap_or(1.0);
        let contribution =
            weight_of(entity_type) as f64 * WEIGHT_SCALE * (1.0 + (count.max(1) as f64).ln()) * confidence;
        base_score += contribution;
        if let Some(category) = category_of(entity_type) {
            *by_category.entry(category).or_insert(0.0) += contribution;
        }
    }

    let (co_mult, _rule) = co_occurrence_multiplier(entity_counts);
    let content_score = base_score * co_mult;
    let final_score = (content_score * exposure_multiplier(exposure)).clamp(0.0, 100.0);

    let mut category_breakdown: Vec<CategoryContribution> = by_category
        .into_iter()
        .map(|(category, score_contribution)| CategoryContribution {
            category: category.to_string(),
            score_contribution: (score_contribution * 10.0).round() / 10.0,
        })
        .collect();
    category_breakdown.sort_by(|a, b| a.category.cmp(&b.category));

    ScoringResult {
        score: final_score.round() as i32,
        tier: RiskTier::from_score(final_score.round() as i32),
        category_breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn confidences(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn single_ssn_is_medium() {
        let entities = counts(&[("SSN", 1)]);
        let conf = confidences(&[("SSN", 0.85)]);
        let result = score(&entities, &conf, ExposureLevel::Private);
        // weight=10 * scale=4.0 * (1+ln(1)=1.0) * 0.85 = 34.0, co_mult=1.0, exp=1.0
        assert_eq!(result.score, 34);
        assert_eq!(result.tier, RiskTier::Medium);
    }

    #[test]
    fn hipaa_co_occurrence_saturates_to_critical() {
        let entities = counts(&[("SSN", 1), ("DIAGNOSIS", 1)]);
        let conf = confidences(&[("SSN", 0.85), ("DIAGNOSIS", 0.85)]);
        let result = score(&entities, &conf, ExposureLevel::Private);
        // base = 34.0 + 30.6 = 64.6, co_mult = 2.0 -> content = 129.2, clamped to 100
        assert_eq!(result.score, 100);
        assert_eq!(result.tier, RiskTier::Critical);
        assert!(result.category_breakdown.iter().any(|c| c.category == "direct_identifier"));
        assert!(result.category_breakdown.iter().any(|c| c.category == "health_info"));
    }

    #[test]
    fn empty_entities_score_zero() {
        let result = score(&HashMap::new(), &HashMap::new(), ExposureLevel::Public);
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, RiskTier::Minimal);
        assert!(result.category_breakdown.is_empty());
    }

    #[test]
    fn exposure_multiplier_scales_public_above_private() {
        let entities = counts(&[("EMAIL", 1)]);
        let conf = confidences(&[("EMAIL", 0.9)]);
        let private = score(&entities, &conf, ExposureLevel::Private);
        let public = score(&entities, &conf, ExposureLevel::Public);
        assert!(public.score > private.score);
    }

    #[test]
    fn co_occurrence_multiplier_is_capped() {
        // classification_marking alone has a 2.5x rule but the cap holds it to 2.0.
        let entities = counts(&[("CLASSIFICATION_LEVEL", 1)]);
        let (mult, rule) = co_occurrence_multiplier(&entities);
        assert_eq!(mult, CO_OCCURRENCE_CAP);
        assert_eq!(rule, Some("classified_data"));
    }

    #[test]
    fn unknown_entity_type_uses_default_weight() {
        let entities = counts(&[("SOME_NEW_TYPE", 1)]);
        let conf = confidences(&[("SOME_NEW_TYPE", 1.0)]);
        let result = score(&entities, &conf, ExposureLevel::Private);
        assert_eq!(result.score, (DEFAULT_WEIGHT as f64 * WEIGHT_SCALE).round() as i32);
        assert!(result.category_breakdown.is_empty());
    }
}
