//! Coreference expander (§4.12): extends NAME-family coverage to pronouns
//! and partial-name mentions tied to a full-name anchor.
//!
//! Ported from `pipeline/coref.py`'s rule-based fallback (the ONNX
//! FastCoref path is a model-backed alternative behind the same contract;
//! callers that have a model can implement [`MentionClusterer`] and feed
//! clusters through [`expand_from_clusters`] instead of
//! [`expand_pronouns_rule_based`]).

use crate::span_validation::validate_span_positions;
use crate::types::{is_name_entity_type, Span, Tier};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const WINDOW_SENTENCES: i64 = 2;
const MAX_EXPANSIONS_PER_ANCHOR: usize = 3;
const MIN_ANCHOR_CONFIDENCE: f64 = 0.85;
const CONFIDENCE_DECAY: f64 = 0.90;
const AMBIGUITY_PENALTY: f64 = 0.8;

const PRONOUNS: &[&str] = &["he", "she", "they", "him", "her", "them", "his", "hers", "their", "theirs"];
const MALE_PRONOUNS: &[&str] = &["he", "him", "his"];
const FEMALE_PRONOUNS: &[&str] = &["she", "her", "hers"];
const NEUTRAL_PRONOUNS: &[&str] = &["they", "them", "their", "theirs"];

const ABBREVIATIONS: &[&str] = &["Dr", "Mr", "Mrs", "Ms", "Jr", "Sr", "Prof", "Rev", "vs", "etc", "Inc", "Ltd", "Corp"];

const TITLES: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "rev", "jr", "sr", "ii", "iii", "iv"];

/// ~50 common female given names used to infer pronoun gender for an
/// anchor (closed list, not an exhaustive gazetteer).
const FEMALE_NAMES: &[&str] = &[
    "mary", "patricia", "jennifer", "linda", "elizabeth", "barbara", "susan", "jessica", "sarah",
    "karen", "nancy", "lisa", "betty", "helen", "sandra", "donna", "carol", "ruth", "sharon",
    "michelle", "laura", "jane", "anna", "emily", "kimberly", "deborah", "dorothy", "amy",
    "angela", "ashley", "brenda", "emma", "olivia", "cynthia", "marie", "janet", "catherine",
    "frances", "christine", "samantha", "debra", "rachel", "carolyn", "janice", "maria",
    "heather", "diane", "julie", "joyce", "victoria", "kelly",
];

/// ~50 common male given names, same role as [`FEMALE_NAMES`].
const MALE_NAMES: &[&str] = &[
    "james", "john", "robert", "michael", "william", "david", "richard", "joseph", "thomas",
    "charles", "christopher", "daniel", "matthew", "anthony", "mark", "donald", "steven", "paul",
    "andrew", "joshua", "kenneth", "kevin", "brian", "george", "edward", "ronald", "timothy",
    "jason", "jeffrey", "ryan", "jacob", "gary", "nicholas", "eric", "jonathan", "stephen",
    "larry", "justin", "scott", "brandon", "benjamin", "samuel", "gregory", "frank", "raymond",
    "alexander", "patrick", "jack", "dennis", "jerry",
];

static PRONOUN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alt = PRONOUNS.join("|");
    Regex::new(&format!(r"(?i)\b({})\b", alt)).unwrap()
});

static SENTENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").unwrap());

/// `(start, end)` pairs for each sentence in `text`.
fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let mut sentences = Vec::new();
    let mut pos = 0usize;

    for m in SENTENCE_PATTERN.find_iter(text) {
        let end = m.end();
        let preceding_start = m.start().saturating_sub(10);
        let preceding = &text[preceding_start..m.start()];
        let last_word = preceding.split_whitespace().next_back();
        if let Some(word) = last_word {
            let bare = word.trim_end_matches('.');
            if ABBREVIATIONS.contains(&bare) {
                continue;
            }
        }
        sentences.push((pos, end));
        pos = end;
    }

    if pos < text.len() {
        sentences.push((pos, text.len()));
    }
    sentences
}

fn sentence_index(pos: usize, sentences: &[(usize, usize)]) -> i64 {
    for (i, &(start, end)) in sentences.iter().enumerate() {
        if start <= pos && pos < end {
            return i as i64;
        }
    }
    sentences.len() as i64 - 1
}

fn infer_gender(name: &str) -> Option<char> {
    let first = name.split_whitespace().next()?.to_lowercase();
    let first = first.trim_end_matches('.');
    if FEMALE_NAMES.contains(&first) {
        Some('F')
    } else if MALE_NAMES.contains(&first) {
        Some('M')
    } else {
        None
    }
}

fn pronoun_matches_gender(pronoun: &str, gender: Option<char>) -> bool {
    let p = pronoun.to_lowercase();
    if NEUTRAL_PRONOUNS.contains(&p.as_str()) {
        return true;
    }
    match gender {
        None => true,
        Some('M') => MALE_PRONOUNS.contains(&p.as_str()),
        Some('F') => FEMALE_PRONOUNS.contains(&p.as_str()),
        Some(_) => true,
    }
}

/// Expand NAME-family anchors (confidence ≥ 0.85) to nearby compatible
/// pronouns, per §4.12's rule-based fallback.
pub fn expand_pronouns_rule_based(text: &str, spans: &[Span]) -> Vec<Span> {
    if text.is_empty() || spans.is_empty() {
        return spans.to_vec();
    }

    let anchors: Vec<(&Span, Option<char>)> = spans
        .iter()
        .filter(|s| is_name_entity_type(&s.entity_type) && s.confidence >= MIN_ANCHOR_CONFIDENCE)
        .map(|s| (s, infer_gender(&s.text)))
        .collect();
    if anchors.is_empty() {
        return spans.to_vec();
    }

    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return spans.to_vec();
    }

    let mut covered: HashSet<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
    let mut expansions: HashMap<usize, usize> = HashMap::new();
    let mut new_spans = Vec::new();

    for m in PRONOUN_PATTERN.find_iter(text) {
        let (pstart, pend) = (m.start(), m.end());
        if covered.contains(&(pstart, pend)) {
            continue;
        }
        let pronoun = m.as_str();
        let pronoun_sentence = sentence_index(pstart, &sentences);

        let mut compatible: Vec<(usize, &Span, Option<char>)> = Vec::new();
        for (anchor_idx, (anchor, gender)) in anchors.iter().enumerate() {
            if *expansions.get(&anchor_idx).unwrap_or(&0) >= MAX_EXPANSIONS_PER_ANCHOR {
                continue;
            }
            let anchor_sentence = sentence_index(anchor.start, &sentences);
            if (pronoun_sentence - anchor_sentence).abs() > WINDOW_SENTENCES {
                continue;
            }
            if pstart < anchor.end {
                continue;
            }
            if !pronoun_matches_gender(pronoun, *gender) {
                continue;
            }
            compatible.push((anchor_idx, anchor, *gender));
        }

        if compatible.is_empty() {
            continue;
        }

        let (anchor_idx, anchor, confidence) = if compatible.len() == 1 {
            let (idx, anchor, _) = compatible[0];
            (idx, anchor, anchor.confidence * CONFIDENCE_DECAY)
        } else {
            let (idx, anchor, _) = compatible
                .iter()
                .min_by_key(|(_, a, _)| pstart.saturating_sub(a.end))
                .copied()
                .unwrap();
            (idx, anchor, anchor.confidence * CONFIDENCE_DECAY * AMBIGUITY_PENALTY)
        };

        let mut new_span = Span::new(pstart, pend, pronoun, anchor.entity_type.clone(), confidence, "coref_rules", Tier::Ml);
        new_span.coref_anchor_value = Some(anchor.text.clone());
        new_spans.push(new_span);
        covered.insert((pstart, pend));
        *expansions.entry(anchor_idx).or_insert(0) += 1;
    }

    let mut result: Vec<Span> = spans.to_vec();
    result.extend(new_spans);
    result.sort_by(|a, b| a.start.cmp(&b.start));
    result
}

/// A mention cluster producer (§4.12's ML-based path): given text, returns
/// clusters of `(start, end)` character spans believed coreferent.
pub trait MentionClusterer: Send + Sync {
    fn cluster(&self, text: &str) -> Vec<Vec<(usize, usize)>>;
}

/// Expand using externally produced mention clusters instead of the
/// rule-based pronoun scan, applying the same anchor/window/cap/decay
/// rules described in §4.12.
pub fn expand_from_clusters(text: &str, spans: &[Span], clusterer: &dyn MentionClusterer) -> Vec<Span> {
    if text.is_empty() || spans.is_empty() {
        return spans.to_vec();
    }

    let anchors: Vec<&Span> = spans
        .iter()
        .filter(|s| is_name_entity_type(&s.entity_type) && s.confidence >= MIN_ANCHOR_CONFIDENCE)
        .collect();
    if anchors.is_empty() {
        return spans.to_vec();
    }

    let sentences = split_sentences(text);
    let mut covered: HashSet<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
    let mut expansions: HashMap<usize, usize> = HashMap::new();
    let mut new_spans = Vec::new();

    for cluster in clusterer.cluster(text) {
        let anchor_hit = cluster.iter().enumerate().find_map(|(_, &(start, end))| {
            anchors
                .iter()
                .enumerate()
                .find(|(_, a)| start < a.end && end > a.start)
                .map(|(idx, a)| (idx, *a))
        });
        let (anchor_idx, anchor) = match anchor_hit {
            Some(v) => v,
            None => continue,
        };
        let anchor_sentence = sentence_index(anchor.start, &sentences);

        for (start, end) in cluster {
            if covered.contains(&(start, end)) {
                continue;
            }
            if start >= text.len() || end > text.len() || start >= end {
                continue;
            }
            let mention = &text[start..end];
            if !PRONOUNS.contains(&mention.to_lowercase().as_str()) {
                continue;
            }
            if *expansions.get(&anchor_idx).unwrap_or(&0) >= MAX_EXPANSIONS_PER_ANCHOR {
                break;
            }
            let mention_sentence = sentence_index(start, &sentences);
            if (mention_sentence - anchor_sentence).abs() > WINDOW_SENTENCES {
                continue;
            }

            let mut new_span = Span::new(
                start,
                end,
                mention,
                anchor.entity_type.clone(),
                anchor.confidence * CONFIDENCE_DECAY,
                "coref_ml",
                Tier::Ml,
            );
            new_span.coref_anchor_value = Some(anchor.text.clone());
            new_spans.push(new_span);
            covered.insert((start, end));
            *expansions.entry(anchor_idx).or_insert(0) += 1;
        }
    }

    let mut result: Vec<Span> = spans.to_vec();
    result.extend(new_spans);
    result.sort_by(|a, b| a.start.cmp(&b.start));
    result
}

fn name_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .map(String::from)
        .filter(|w| !TITLES.contains(&w.as_str()))
        .collect()
}

/// Union-find partial-name linking (runs after pronoun resolution): groups
/// NAME-family spans sharing a non-title word, picks the longest span in
/// each group as the anchor, and sets `coref_anchor_value` on the rest. No
/// new spans are emitted.
pub fn link_partial_names(spans: Vec<Span>, min_confidence: f64) -> Vec<Span> {
    let eligible: Vec<usize> = spans
        .iter()
        .enumerate()
        .filter(|(_, s)| is_name_entity_type(&s.entity_type) && s.confidence >= min_confidence)
        .map(|(i, _)| i)
        .collect();
    if eligible.len() < 2 {
        return spans;
    }

    let words_by_span: HashMap<usize, HashSet<String>> =
        eligible.iter().map(|&i| (i, name_words(&spans[i].text))).collect();

    let mut word_to_spans: HashMap<&str, Vec<usize>> = HashMap::new();
    for &idx in &eligible {
        for word in &words_by_span[&idx] {
            if word.chars().count() >= 2 {
                word_to_spans.entry(word.as_str()).or_default().push(idx);
            }
        }
    }

    let mut parent: HashMap<usize, usize> = eligible.iter().map(|&i| (i, i)).collect();
    fn find(parent: &mut HashMap<usize, usize>, x: usize) -> usize {
        if parent[&x] != x {
            let root = find(parent, parent[&x]);
            parent.insert(x, root);
        }
        parent[&x]
    }
    fn union(parent: &mut HashMap<usize, usize>, a: usize, b: usize) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            let target = ra.min(rb);
            let other = ra.max(rb);
            parent.insert(other, target);
        }
    }

    for &idx in &eligible {
        for word in &words_by_span[&idx] {
            if let Some(others) = word_to_spans.get(word.as_str()) {
                for &other in others {
                    union(&mut parent, idx, other);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for &idx in &eligible {
        let root = find(&mut parent, idx);
        groups.entry(root).or_default().push(idx);
    }

    let mut result = spans;
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let anchor_idx = *members
            .iter()
            .max_by_key(|&&i| (result[i].text.chars().count(), std::cmp::Reverse(result[i].start)))
            .unwrap();
        let anchor_text = result[anchor_idx].text.clone();
        for &idx in members {
            if idx == anchor_idx || result[idx].coref_anchor_value.is_some() {
                continue;
            }
            result[idx].coref_anchor_value = Some(anchor_text.clone());
        }
    }

    result
}

/// Full pipeline: rule-based pronoun expansion, partial-name linking, then
/// lenient re-validation against `text` (§4.12's "validation after coref").
pub fn resolve_coreferences(text: &str, spans: Vec<Span>) -> Vec<Span> {
    if text.is_empty() || spans.is_empty() {
        return spans;
    }
    let expanded = expand_pronouns_rule_based(text, &spans);
    let linked = link_partial_names(expanded, MIN_ANCHOR_CONFIDENCE);
    validate_span_positions(text, linked, false).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_pronoun_to_compatible_anchor() {
        let text = "John Smith arrived early. He was tired.";
        let anchor = Span::new(0, 10, "John Smith", "NAME_PATIENT", 0.95, "pii", Tier::Pattern);
        let result = expand_pronouns_rule_based(text, &[anchor]);
        assert!(result.iter().any(|s| s.text.eq_ignore_ascii_case("he") && s.coref_anchor_value.is_some()));
    }

    #[test]
    fn skips_incompatible_gender_pronoun() {
        let text = "Mary Jones left. He called later.";
        let anchor = Span::new(0, 10, "Mary Jones", "NAME", 0.95, "pii", Tier::Pattern);
        let result = expand_pronouns_rule_based(text, &[anchor]);
        assert!(!result.iter().any(|s| s.text.eq_ignore_ascii_case("he")));
    }

    #[test]
    fn caps_expansions_per_anchor_at_three() {
        let text = "Robert Lee met the team. He greeted them. He smiled. He left. He returned.";
        let anchor = Span::new(0, 10, "Robert Lee", "NAME", 0.95, "pii", Tier::Pattern);
        let result = expand_pronouns_rule_based(text, &[anchor]);
        let expansions = result.iter().filter(|s| s.detector == "coref_rules").count();
        assert!(expansions <= MAX_EXPANSIONS_PER_ANCHOR);
    }

    #[test]
    fn links_partial_name_to_full_name_anchor() {
        let spans = vec![
            Span::new(0, 10, "Jane Smith", "NAME_PATIENT", 0.95, "pii", Tier::Pattern),
            Span::new(20, 25, "Smith", "NAME_PATIENT", 0.90, "pii", Tier::Pattern),
        ];
        let linked = link_partial_names(spans, 0.70);
        let partial = linked.iter().find(|s| s.text == "Smith").unwrap();
        assert_eq!(partial.coref_anchor_value.as_deref(), Some("Jane Smith"));
    }

    #[test]
    fn abbreviation_does_not_split_sentence() {
        let text = "Seen by Dr. Lee today. He prescribed medication.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
    }
}
