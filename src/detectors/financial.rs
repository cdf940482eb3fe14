//! PATTERN-tier financial identifiers and cryptocurrency addresses (§4.5).
//!
//! CUSIP/ISIN/SEDOL/SWIFT/LEI and the Base58/Bech32/Ethereum crypto address
//! patterns come from [`crate::patterns::FINANCIAL_PATTERNS`]; BIP-39 seed
//! phrase detection is implemented here since it scans word sequences
//! rather than a single regex match.

use super::{run_pattern_table, Detector};
use crate::patterns::FINANCIAL_PATTERNS;
use crate::types::{Span, Tier};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// A representative sample of the BIP-39 English wordlist — large enough to
/// make the ≥ 50 % match rule discriminating, but explicitly a sample, not
/// the full 2048-word list (per the Open Question resolution: the source
/// itself only ships a small sample).
const BIP39_SAMPLE_WORDS: &[&str] = &[
    "abandon", "ability", "able", "about", "above", "absent", "absorb", "abstract",
    "absurd", "abuse", "access", "accident", "account", "accuse", "achieve", "acid",
    "acoustic", "acquire", "across", "act", "action", "actor", "actress", "actual",
    "adapt", "add", "addict", "address", "adjust", "admit", "adult", "advance",
    "advice", "aerobic", "affair", "afford", "afraid", "again", "age", "agent",
    "agree", "ahead", "aim", "air", "airport", "aisle", "alarm", "album",
    "alcohol", "alert", "alien", "all", "alley", "allow", "almost", "alone",
    "alpha", "already", "also", "alter", "always", "amateur", "amazing", "among",
    "amount", "amused", "analyst", "anchor", "ancient", "anger", "angle", "angry",
    "animal", "ankle", "announce", "annual", "another", "answer", "antenna", "antique",
    "anxiety", "any", "apart", "apology", "appear", "apple", "approve", "april",
    "arch", "arctic", "area", "arena", "argue", "arm", "armed", "armor",
    "army", "around", "arrange", "arrest", "arrive", "arrow", "art", "artefact",
    "artist", "artwork", "ask", "aspect", "assault", "asset", "assist", "assume",
    "asthma", "athlete", "atom", "attack", "attend", "attitude", "attract", "auction",
    "audit", "august", "aunt", "author", "auto", "autumn", "average", "avocado",
    "avoid", "awake", "aware", "away", "awesome", "awful", "awkward", "axis",
    "baby", "bachelor", "bacon", "badge", "bag", "balance", "balcony", "ball",
    "bamboo", "banana", "banner", "bar", "barely", "bargain", "barrel", "base",
    "basic", "basket", "battle", "beach", "bean", "beauty", "because", "become",
    "beef", "before", "begin", "behave", "behind", "believe", "below", "belt",
    "bench", "benefit", "best", "betray", "better", "between", "beyond", "bicycle",
    "bid", "bike", "bind", "biology", "bird", "birth", "bitter", "black",
    "blade", "blame", "blanket", "blast", "bleak", "bless", "blind", "blood",
    "blossom", "blouse", "blue", "blur", "blush", "board", "boat", "body",
    "boil", "bomb", "bone", "bonus", "book", "boost", "border", "boring",
    "borrow", "boss", "bottom", "bounce", "box", "boy", "bracket", "brain",
    "brand", "brass", "brave", "bread", "breeze", "brick", "bridge", "brief",
    "bright", "bring", "brisk", "broccoli", "broken", "bronze", "broom", "brother",
    "brown", "brush", "bubble", "buddy", "budget", "buffalo", "build", "bulb",
    "bulk", "bullet", "bundle", "bunker", "burden", "burger", "burst", "bus",
    "business", "busy", "butter", "buyer", "buzz",
];

fn bip39_word_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| BIP39_SAMPLE_WORDS.iter().copied().collect())
}

fn seed_phrase_candidate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:[a-z]+\s+){11,23}[a-z]+\b").unwrap())
}

/// Accept word counts of 12/15/18/21/24, requiring ≥ 50 % sample-wordlist
/// membership (spec.md §4.5).
fn validate_seed_phrase(candidate: &str) -> bool {
    let words: Vec<&str> = candidate.split_whitespace().collect();
    if !matches!(words.len(), 12 | 15 | 18 | 21 | 24) {
        return false;
    }
    let set = bip39_word_set();
    let matches = words.iter().filter(|w| set.contains(*w)).count();
    (matches as f64 / words.len() as f64) >= 0.5
}

fn detect_seed_phrases(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    for m in seed_phrase_candidate_re().find_iter(text) {
        if validate_seed_phrase(m.as_str()) {
            spans.push(Span::new(
                m.start(),
                m.end(),
                m.as_str(),
                "CRYPTO_SEED_PHRASE",
                0.85,
                "financial",
                Tier::Pattern,
            ));
        }
    }
    spans
}

pub struct FinancialDetector;

impl FinancialDetector {
    pub fn new() -> Self {
        FinancialDetector
    }
}

impl Default for FinancialDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for FinancialDetector {
    fn name(&self) -> &str {
        "financial"
    }

    fn tier(&self) -> Tier {
        Tier::Pattern
    }

    fn detect(&self, text: &str) -> Vec<Span> {
        let mut spans = run_pattern_table(text, FINANCIAL_PATTERNS, self.name(), self.tier());
        spans.extend(detect_seed_phrases(text));
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        spans
    }
}
