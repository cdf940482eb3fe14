//! Core data model: `Span`, tiers, exposure levels, and the entity-type
//! taxonomy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;

/// Detector authority level. Ordered `ML < PATTERN < STRUCTURED < CHECKSUM`;
/// a higher tier wins ties during span resolution and calibration gives it a
/// higher confidence floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    Ml = 1,
    Pattern = 2,
    Structured = 3,
    Checksum = 4,
}

impl Tier {
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Tier::Ml),
            2 => Some(Tier::Pattern),
            3 => Some(Tier::Structured),
            4 => Some(Tier::Checksum),
            _ => None,
        }
    }

    /// Calibration floor for this tier (§4.10).
    pub fn floor(self) -> f64 {
        match self {
            Tier::Ml => 0.00,
            Tier::Pattern => 0.50,
            Tier::Structured => 0.75,
            Tier::Checksum => 0.90,
        }
    }

    /// Calibration ceiling: the next tier's floor, 1.0 for the top tier.
    pub fn ceiling(self) -> f64 {
        match self {
            Tier::Ml => Tier::Pattern.floor(),
            Tier::Pattern => Tier::Structured.floor(),
            Tier::Structured => Tier::Checksum.floor(),
            Tier::Checksum => 1.0,
        }
    }
}

/// Risk tier bucket a [`crate::types::ScoringResult`] score maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: i32) -> Self {
        match score {
            0..=10 => RiskTier::Minimal,
            11..=30 => RiskTier::Low,
            31..=54 => RiskTier::Medium,
            55..=79 => RiskTier::High,
            _ => RiskTier::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Minimal => "MINIMAL",
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
        }
    }
}

/// Accessibility of the document the text was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureLevel {
    Private,
    Internal,
    OrgWide,
    Public,
}

impl ExposureLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ExposureLevel::Private => "PRIVATE",
            ExposureLevel::Internal => "INTERNAL",
            ExposureLevel::OrgWide => "ORG_WIDE",
            ExposureLevel::Public => "PUBLIC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "PRIVATE" => Some(ExposureLevel::Private),
            "INTERNAL" => Some(ExposureLevel::Internal),
            "ORG_WIDE" | "ORGWIDE" => Some(ExposureLevel::OrgWide),
            "PUBLIC" => Some(ExposureLevel::Public),
            _ => None,
        }
    }
}

/// A single detection: a half-open `[start, end)` character interval plus
/// its entity type, confidence, provenance and tier.
///
/// `needs_review`/`review_reason` are supplemental metadata a detector may
/// set to flag a match for human review (e.g. an SSN with a structurally
/// invalid area code that is still above the drop threshold); they carry no
/// weight in any invariant from §3/§8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub entity_type: String,
    pub confidence: f64,
    pub detector: String,
    pub tier: Tier,
    pub coref_anchor_value: Option<String>,
    #[serde(default)]
    pub needs_review: bool,
    #[serde(default)]
    pub review_reason: Option<String>,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        text: impl Into<String>,
        entity_type: impl Into<String>,
        confidence: f64,
        detector: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Span {
            start,
            end,
            text: text.into(),
            entity_type: normalize_entity_type(&entity_type.into()),
            confidence,
            detector: detector.into(),
            tier,
            coref_anchor_value: None,
            needs_review: false,
            review_reason: None,
        }
    }

    pub fn with_review(mut self, reason: impl Into<String>) -> Self {
        self.needs_review = true;
        self.review_reason = Some(reason.into());
        self
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `self` and `other` overlap (share at least one character).
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `self` fully contains `other`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Aliases of entity-type strings seen in the wild (legacy labels, common
/// alternate spellings) mapped onto the canonical taxonomy label. Grounded
/// in the teacher's `ENTITY_ALIASES` table.
fn entity_aliases() -> &'static HashMap<&'static str, &'static str> {
    use std::sync::OnceLock;
    static ALIASES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("US_SSN", "SSN");
        m.insert("SOCIAL_SECURITY", "SSN");
        m.insert("SOCIALSECURITYNUMBER", "SSN");
        m.insert("PER", "NAME");
        m.insert("PERSON", "NAME");
        m.insert("PATIENT", "NAME_PATIENT");
        m.insert("DOCTOR", "NAME_PROVIDER");
        m.insert("PHYSICIAN", "NAME_PROVIDER");
        m.insert("HCW", "NAME_PROVIDER");
        m.insert("DOB", "DATE_DOB");
        m.insert("BIRTHDAY", "DATE_DOB");
        m.insert("DATEOFBIRTH", "DATE_DOB");
        m.insert("DATE_OF_BIRTH", "DATE_DOB");
        m.insert("BIRTH_DATE", "DATE_DOB");
        m.insert("BIRTHDATE", "DATE_DOB");
        m.insert("CC", "CREDIT_CARD");
        m.insert("CREDITCARD", "CREDIT_CARD");
        m.insert("CREDITCARDNUMBER", "CREDIT_CARD");
        m.insert("CREDIT_CARD_NUMBER", "CREDIT_CARD");
        m.insert("TELEPHONE", "PHONE");
        m.insert("TEL", "PHONE");
        m.insert("MOBILE", "PHONE");
        m.insert("CELL", "PHONE");
        m.insert("PHONENUMBER", "PHONE");
        m.insert("PHONE_NUMBER", "PHONE");
        m.insert("US_PHONE_NUMBER", "PHONE");
        m.insert("EMAILADDRESS", "EMAIL");
        m.insert("EMAIL_ADDRESS", "EMAIL");
        m.insert("STREET_ADDRESS", "ADDRESS");
        m.insert("STREET", "ADDRESS");
        m.insert("IP", "IP_ADDRESS");
        m.insert("IPADDRESS", "IP_ADDRESS");
        m.insert("IPV4", "IP_ADDRESS");
        m.insert("IPV6", "IP_ADDRESS");
        m.insert("MEDICAL_RECORD", "MRN");
        m.insert("MEDICALRECORD", "MRN");
        m.insert("LICENSE", "DRIVER_LICENSE");
        m.insert("US_DRIVER_LICENSE", "DRIVER_LICENSE");
        m.insert("DRIVERSLICENSE", "DRIVER_LICENSE");
        m.insert("US_PASSPORT", "PASSPORT");
        m.insert("PASSPORT_NUMBER", "PASSPORT");
        m.insert("ZIPCODE", "ZIP");
        m.insert("ZIP_CODE", "ZIP");
        m.insert("POSTCODE", "ZIP");
        m.insert("LOCATION_ZIP", "ZIP");
        m
    })
}

/// Normalize an entity-type label to its canonical taxonomy form.
pub fn normalize_entity_type(entity_type: &str) -> String {
    let upper = entity_type.to_uppercase();
    match entity_aliases().get(upper.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => upper,
    }
}

/// NAME-family entity types eligible as coreference anchors.
pub const NAME_ENTITY_TYPES: &[&str] =
    &["NAME", "NAME_PATIENT", "NAME_PROVIDER", "NAME_RELATIVE", "PERSON", "PER"];

pub fn is_name_entity_type(entity_type: &str) -> bool {
    let normalized = normalize_entity_type(entity_type);
    NAME_ENTITY_TYPES.contains(&normalized.as_str())
}

/// The closed taxonomy, grouped by family. This is the "data file, not
/// hard-coded" artifact spec.md §3/§6 calls for, expressed as a const table
/// rather than a loaded file since the crate has no file-I/O surface.
pub const ENTITY_TAXONOMY: &[(&str, &str)] = &[
    // identifiers
    ("SSN", "identifiers"),
    ("PASSPORT", "identifiers"),
    ("DRIVER_LICENSE", "identifiers"),
    ("MILITARY_ID", "identifiers"),
    ("TAX_ID", "identifiers"),
    ("STATE_ID", "identifiers"),
    ("MRN", "identifiers"),
    ("EMPLOYEE_ID", "identifiers"),
    ("MEMBER_ID", "identifiers"),
    // names
    ("NAME", "names"),
    ("NAME_PATIENT", "names"),
    ("NAME_PROVIDER", "names"),
    ("NAME_RELATIVE", "names"),
    // contact
    ("EMAIL", "contact"),
    ("PHONE", "contact"),
    ("FAX", "contact"),
    ("ADDRESS", "contact"),
    ("ZIP", "contact"),
    ("CITY", "contact"),
    ("STATE", "contact"),
    ("COUNTRY", "contact"),
    ("FACILITY", "contact"),
    ("ORGANIZATION", "contact"),
    ("EMPLOYER", "contact"),
    // financial
    ("CREDIT_CARD", "financial"),
    ("IBAN", "financial"),
    ("SWIFT_BIC", "financial"),
    ("ACCOUNT_NUMBER", "financial"),
    ("CUSIP", "financial"),
    ("ISIN", "financial"),
    ("SEDOL", "financial"),
    ("LEI", "financial"),
    ("FIGI", "financial"),
    ("BITCOIN_ADDRESS", "financial"),
    ("ETHEREUM_ADDRESS", "financial"),
    ("SOLANA_ADDRESS", "financial"),
    ("CARDANO_ADDRESS", "financial"),
    ("LITECOIN_ADDRESS", "financial"),
    ("CRYPTO_SEED_PHRASE", "financial"),
    ("BANK_ROUTING", "financial"),
    ("TRACKING_NUMBER", "financial"),
    // healthcare
    ("DIAGNOSIS", "healthcare"),
    ("MEDICATION", "healthcare"),
    ("HEALTH_PLAN_ID", "healthcare"),
    ("NPI", "healthcare"),
    ("DEA", "healthcare"),
    ("LAB_TEST", "healthcare"),
    ("PROCEDURE", "healthcare"),
    // secrets/credentials
    ("PASSWORD", "credentials"),
    ("API_KEY", "credentials"),
    ("PRIVATE_KEY", "credentials"),
    ("JWT", "credentials"),
    ("AWS_ACCESS_KEY", "credentials"),
    ("AWS_SECRET_KEY", "credentials"),
    ("GITHUB_TOKEN", "credentials"),
    ("GITLAB_TOKEN", "credentials"),
    ("SLACK_TOKEN", "credentials"),
    ("STRIPE_KEY", "credentials"),
    ("TWILIO_KEY", "credentials"),
    ("SENDGRID_KEY", "credentials"),
    ("DATABASE_URL", "credentials"),
    // government classification
    ("CLASSIFICATION_LEVEL", "government"),
    ("CLASSIFICATION_MARKING", "government"),
    ("SCI_MARKING", "government"),
    ("DISSEMINATION_CONTROL", "government"),
    ("CAGE_CODE", "government"),
    ("DUNS", "government"),
    ("UEI", "government"),
    ("DOD_CONTRACT", "government"),
    ("GSA_CONTRACT", "government"),
    ("CLEARANCE_LEVEL", "government"),
    ("ITAR_EAR_MARKING", "government"),
    // geography
    ("IP_ADDRESS", "geography"),
    ("MAC_ADDRESS", "geography"),
    ("VIN", "geography"),
    // dates
    ("DATE", "dates"),
    ("DATE_DOB", "dates"),
    // demographics
    ("AGE", "demographics"),
];

pub fn is_known_entity_type(entity_type: &str) -> bool {
    let normalized = normalize_entity_type(entity_type);
    ENTITY_TAXONOMY.iter().any(|(t, _)| *t == normalized)
}

/// Produced by the orchestrator's `detect` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub spans: Vec<Span>,
    pub entity_counts: HashMap<String, i32>,
    pub detectors_used: HashSet<String>,
    pub processing_time_ms: f64,
    pub text_length: usize,
    pub policy_result: Option<crate::policy::schema::PolicyResult>,
}

impl DetectionResult {
    pub fn empty(text_length: usize) -> Self {
        DetectionResult {
            spans: Vec::new(),
            entity_counts: HashMap::new(),
            detectors_used: HashSet::new(),
            processing_time_ms: 0.0,
            text_length,
            policy_result: None,
        }
    }
}

/// Contribution of a single category to a risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryContribution {
    pub category: String,
    pub score_contribution: f64,
}

/// Produced by [`crate::scoring::score`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: i32,
    pub tier: RiskTier,
    pub category_breakdown: Vec<CategoryContribution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering() {
        assert!(Tier::Checksum > Tier::Structured);
        assert!(Tier::Structured > Tier::Pattern);
        assert!(Tier::Pattern > Tier::Ml);
    }

    #[test]
    fn tier_calibration_bands_are_contiguous() {
        assert_eq!(Tier::Ml.ceiling(), Tier::Pattern.floor());
        assert_eq!(Tier::Pattern.ceiling(), Tier::Structured.floor());
        assert_eq!(Tier::Structured.ceiling(), Tier::Checksum.floor());
        assert_eq!(Tier::Checksum.ceiling(), 1.0);
    }

    #[test]
    fn normalize_aliases() {
        assert_eq!(normalize_entity_type("us_ssn"), "SSN");
        assert_eq!(normalize_entity_type("DOB"), "DATE_DOB");
        assert_eq!(normalize_entity_type("SSN"), "SSN");
    }

    #[test]
    fn span_overlap_and_contains() {
        let a = Span::new(0, 10, "0123456789", "NAME", 0.9, "t", Tier::Pattern);
        let b = Span::new(5, 8, "567", "NAME", 0.9, "t", Tier::Pattern);
        assert!(a.overlaps(&b));
        assert!(a.contains(&b));
        assert!(!b.contains(&a));
    }

    #[test]
    fn risk_tier_boundaries() {
        assert_eq!(RiskTier::from_score(0), RiskTier::Minimal);
        assert_eq!(RiskTier::from_score(11), RiskTier::Low);
        assert_eq!(RiskTier::from_score(31), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(55), RiskTier::High);
        assert_eq!(RiskTier::from_score(80), RiskTier::Critical);
        assert_eq!(RiskTier::from_score(100), RiskTier::Critical);
    }
}
