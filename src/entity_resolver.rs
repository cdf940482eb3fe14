//! Entity resolution (SPEC_FULL §C.3, supplemental): groups mentions
//! (spans) that refer to the same real-world entity via a multi-sieve,
//! union-find approach. Distinct from the span resolver (§4.11), which
//! dedupes *overlapping* spans — this module groups *disjoint* spans that
//! name the same thing, e.g. "John Smith" at offset 10 and "Mr. Smith" at
//! offset 200.

use crate::types::{Span, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Name-family types eligible for the partial-name sieve.
const NAME_TYPES: &[&str] = &["NAME", "NAME_PATIENT", "NAME_PROVIDER", "NAME_RELATIVE", "PERSON"];

const TITLES: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "rev", "jr", "sr", "ii", "iii", "iv"];

struct Mention {
    span: Span,
    normalized_text: String,
    words: HashSet<String>,
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

fn mention_words(normalized: &str, entity_type: &str) -> HashSet<String> {
    if !NAME_TYPES.contains(&entity_type) {
        return HashSet::new();
    }
    normalized
        .replace('.', "")
        .split_whitespace()
        .map(|w| w.to_string())
        .filter(|w| !TITLES.contains(&w.as_str()))
        .collect()
}

/// A resolved real-world entity, made up of one or more mentions (spans).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: String,
    pub canonical_value: String,
    pub mentions: Vec<Span>,
}

impl Entity {
    pub fn count(&self) -> usize {
        self.mentions.len()
    }

    pub fn positions(&self) -> Vec<(usize, usize)> {
        self.mentions.iter().map(|m| (m.start, m.end)).collect()
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let (px, py) = (self.find(x), self.find(y));
        if px != py {
            self.parent[px] = py;
        }
    }
}

fn apply_sieves(mentions: &[Mention]) -> Vec<usize> {
    let n = mentions.len();
    let mut uf = UnionFind::new(n);

    let mut text_index: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut coref_index: HashMap<String, Vec<usize>> = HashMap::new();
    let mut word_index: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, m) in mentions.iter().enumerate() {
        text_index.entry(m.normalized_text.as_str()).or_default().push(i);
        if let Some(anchor) = &m.span.coref_anchor_value {
            coref_index.entry(anchor.to_lowercase()).or_default().push(i);
        }
        for word in &m.words {
            if word.len() >= 2 {
                word_index.entry(word.as_str()).or_default().push(i);
            }
        }
    }

    // Sieve 1: exact normalized text match.
    for indices in text_index.values() {
        for &i in &indices[1..] {
            uf.union(indices[0], i);
        }
    }

    // Sieve 2: partial name match. A multi-word name absorbs single-word
    // partials sharing a word, and multi-word names sharing any word merge.
    for indices in word_index.values() {
        if indices.len() < 2 {
            continue;
        }
        let multi_word: Vec<usize> = indices.iter().copied().filter(|&i| mentions[i].words.len() > 1).collect();
        let single_word: Vec<usize> = indices.iter().copied().filter(|&i| mentions[i].words.len() == 1).collect();

        if let Some(&anchor) = multi_word.first() {
            for &si in &single_word {
                uf.union(anchor, si);
            }
        }
        for i in 0..multi_word.len() {
            for j in (i + 1)..multi_word.len() {
                let (mi, mj) = (multi_word[i], multi_word[j]);
                if !mentions[mi].words.is_disjoint(&mentions[mj].words) {
                    uf.union(mi, mj);
                }
            }
        }
    }

    // Sieve 3: coreference links — a pronoun's anchor text resolves to
    // whichever mentions share that exact normalized text.
    for (anchor, indices) in &coref_index {
        if let Some(anchor_indices) = text_index.get(anchor.as_str()) {
            for &i in indices {
                for &ai in anchor_indices {
                    uf.union(i, ai);
                }
            }
        }
    }

    (0..n).map(|i| uf.find(i)).collect()
}

fn groups_to_entities(roots: Vec<usize>, mentions: Vec<Mention>) -> Vec<Entity> {
    let mut grouped: HashMap<usize, Vec<Mention>> = HashMap::new();
    for (mention, root) in mentions.into_iter().zip(roots) {
        grouped.entry(root).or_default().push(mention);
    }

    let mut entities: Vec<Entity> = grouped
        .into_values()
        .map(|group| {
            let canonical = group
                .iter()
                .max_by_key(|m| (m.span.text.chars().count(), std::cmp::Reverse(m.span.start)))
                .expect("group is non-empty by construction")
                .span
                .text
                .clone();
            let best_tier = group.iter().map(|m| m.span.tier).max().unwrap_or(Tier::Ml);
            let entity_type = group
                .iter()
                .find(|m| m.span.tier == best_tier)
                .expect("best_tier was derived from this group")
                .span
                .entity_type
                .clone();
            Entity {
                id: Uuid::new_v4().to_string(),
                entity_type,
                canonical_value: canonical,
                mentions: group.into_iter().map(|m| m.span).collect(),
            }
        })
        .collect();

    entities.sort_by_key(|e| e.mentions.iter().map(|m| m.start).min().unwrap_or(0));
    entities
}

/// Group `spans` into real-world entities (SPEC_FULL §C.3). Spans below
/// `min_confidence` are dropped before resolution, matching the source's
/// `EntityResolver(min_confidence=...)`.
pub fn resolve_entities(spans: Vec<Span>, min_confidence: f64) -> Vec<Entity> {
    let eligible: Vec<Span> = spans.into_iter().filter(|s| s.confidence >= min_confidence).collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let mentions: Vec<Mention> = eligible
        .into_iter()
        .map(|span| {
            let normalized_text = normalize_text(&span.text);
            let words = mention_words(&normalized_text, &span.entity_type);
            Mention { span, normalized_text, words }
        })
        .collect();

    let roots = apply_sieves(&mentions);
    groups_to_entities(roots, mentions)
}

/// Unique-entity counts by type, as opposed to [`crate::types::DetectionResult::entity_counts`]
/// which counts raw mentions.
pub fn entity_counts(entities: &[Entity]) -> HashMap<String, i32> {
    let mut counts = HashMap::new();
    for entity in entities {
        *counts.entry(entity.entity_type.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_span(start: usize, end: usize, text: &str, confidence: f64) -> Span {
        Span::new(start, end, text, "NAME", confidence, "pii", Tier::Pattern)
    }

    #[test]
    fn exact_duplicate_text_groups_together() {
        let spans = vec![name_span(0, 10, "John Smith", 0.9), name_span(50, 60, "John Smith", 0.9)];
        let entities = resolve_entities(spans, 0.7);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].count(), 2);
        assert_eq!(entities[0].canonical_value, "John Smith");
    }

    #[test]
    fn single_word_partial_is_absorbed_by_multi_word_name() {
        let spans = vec![name_span(0, 10, "John Smith", 0.9), name_span(100, 105, "Smith", 0.85)];
        let entities = resolve_entities(spans, 0.7);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].count(), 2);
    }

    #[test]
    fn unrelated_names_stay_separate() {
        let spans = vec![name_span(0, 4, "John", 0.9), name_span(50, 56, "Alicia", 0.9)];
        let entities = resolve_entities(spans, 0.7);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn below_confidence_spans_are_dropped() {
        let spans = vec![name_span(0, 10, "John Smith", 0.5)];
        let entities = resolve_entities(spans, 0.7);
        assert!(entities.is_empty());
    }

    #[test]
    fn coref_anchor_links_pronoun_mention_to_anchor() {
        let mut pronoun_span = Span::new(20, 22, "he", "NAME", 0.76, "coref", Tier::Ml);
        pronoun_span.coref_anchor_value = Some("John Smith".to_string());
        let spans = vec![name_span(0, 10, "John Smith", 0.9), pronoun_span];
        let entities = resolve_entities(spans, 0.7);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].count(), 2);
    }

    #[test]
    fn non_name_types_are_isolated_by_exact_text_only() {
        let spans = vec![
            Span::new(0, 11, "078-05-1120", "SSN", 0.95, "checksum", Tier::Checksum),
            Span::new(50, 61, "078-05-1120", "SSN", 0.95, "checksum", Tier::Checksum),
            Span::new(100, 111, "219-09-9999", "SSN", 0.95, "checksum", Tier::Checksum),
        ];
        let entities = resolve_entities(spans, 0.7);
        assert_eq!(entities.len(), 2);
    }
}
