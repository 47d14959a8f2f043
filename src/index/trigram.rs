//! Character trigram index for fuzzy matching
//!
//! Text is split into runs of alphanumeric characters, each run is
//! lowercased and padded with two leading blanks and one trailing blank, and
//! every window of three characters becomes a trigram. Similarity between two
//! texts is the Jaccard ratio of their distinct trigram sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use roaring::RoaringTreemap;

use super::postings::Generation;
use crate::models::DocumentId;

/// Trigram multiset extracted from a piece of text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrigramSet {
    counts: BTreeMap<String, u32>,
}

impl TrigramSet {
    /// Distinct trigrams
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total occurrences including duplicates
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn count(&self, gram: &str) -> u32 {
        self.counts.get(gram).copied().unwrap_or(0)
    }

    pub fn contains(&self, gram: &str) -> bool {
        self.counts.contains_key(gram)
    }

    pub fn grams(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Jaccard similarity of the distinct trigram sets, in `[0, 1]`
    pub fn similarity(&self, other: &TrigramSet) -> f32 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let shared = small.grams().filter(|g| large.contains(g)).count();
        let union = self.len() + other.len() - shared;
        if union == 0 {
            0.0
        } else {
            shared as f32 / union as f32
        }
    }
}

/// Runs of alphanumeric characters, the unit trigrams are padded around
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// Extract the trigram multiset of a text
pub fn extract_trigrams(text: &str) -> TrigramSet {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for word in words(text) {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            *counts.entry(window.iter().collect()).or_insert(0) += 1;
        }
    }
    TrigramSet { counts }
}

/// Similarity of two texts
pub fn similarity(a: &str, b: &str) -> f32 {
    extract_trigrams(a).similarity(&extract_trigrams(b))
}

/// Trigram -> documents, with a forward map of the trigrams each document
/// version contributed.
pub struct TrigramIndex {
    grams: DashMap<String, RoaringTreemap>,
    forward: DashMap<DocumentId, Vec<(Generation, Arc<TrigramSet>)>>,
}

impl Default for TrigramIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TrigramIndex {
    pub fn new() -> Self {
        Self {
            grams: DashMap::new(),
            forward: DashMap::new(),
        }
    }

    /// Stage the trigrams of one document version
    pub fn insert(&self, doc_id: DocumentId, generation: Generation, content: &str) {
        let set = Arc::new(extract_trigrams(content));
        for gram in set.grams() {
            self.grams
                .entry(gram.to_string())
                .or_default()
                .insert(doc_id);
        }
        let mut versions = self.forward.entry(doc_id).or_default();
        versions.retain(|(g, _)| *g != generation);
        versions.push((generation, set));
    }

    /// Drop every version except `keep`, unlinking grams `keep` does not use
    pub fn retire(&self, doc_id: DocumentId, keep: Generation) {
        let (kept, dropped) = {
            let Some(mut versions) = self.forward.get_mut(&doc_id) else {
                return;
            };
            let (kept, dropped): (Vec<_>, Vec<_>) =
                versions.drain(..).partition(|(g, _)| *g == keep);
            *versions = kept.clone();
            (kept, dropped)
        };
        self.forward.remove_if(&doc_id, |_, v| v.is_empty());

        let still_used: BTreeSet<&str> = kept.iter().flat_map(|(_, set)| set.grams()).collect();
        for (_, set) in &dropped {
            for gram in set.grams().filter(|g| !still_used.contains(g)) {
                self.unlink(gram, doc_id);
            }
        }
    }

    /// Remove a document entirely; returns whether it was present
    pub fn remove(&self, doc_id: DocumentId) -> bool {
        let Some((_, versions)) = self.forward.remove(&doc_id) else {
            return false;
        };
        let grams: BTreeSet<&str> = versions.iter().flat_map(|(_, set)| set.grams()).collect();
        for gram in grams {
            self.unlink(gram, doc_id);
        }
        true
    }

    fn unlink(&self, gram: &str, doc_id: DocumentId) {
        let emptied = match self.grams.get_mut(gram) {
            Some(mut docs) => {
                docs.remove(doc_id);
                docs.is_empty()
            }
            None => false,
        };
        if emptied {
            self.grams.remove_if(gram, |_, docs| docs.is_empty());
        }
    }

    /// Documents sharing at least one trigram with the query
    pub fn candidates(&self, query: &TrigramSet) -> RoaringTreemap {
        let mut docs = RoaringTreemap::new();
        for gram in query.grams() {
            if let Some(ids) = self.grams.get(gram) {
                docs |= ids.value();
            }
        }
        docs
    }

    /// Trigram set of a specific document version
    pub fn version(&self, doc_id: DocumentId, generation: Generation) -> Option<Arc<TrigramSet>> {
        self.forward.get(&doc_id).and_then(|versions| {
            versions
                .iter()
                .find(|(g, _)| *g == generation)
                .map(|(_, set)| set.clone())
        })
    }

    /// Generations staged for a document, ascending
    pub fn generations(&self, doc_id: DocumentId) -> Vec<Generation> {
        let mut generations: Vec<Generation> = self
            .forward
            .get(&doc_id)
            .map(|versions| versions.iter().map(|(g, _)| *g).collect())
            .unwrap_or_default();
        generations.sort_unstable();
        generations
    }

    /// Similarity of one staged version of a document to a query
    pub fn similarity(
        &self,
        doc_id: DocumentId,
        generation: Generation,
        query: &str,
    ) -> Option<f32> {
        self.version(doc_id, generation)
            .map(|set| set.similarity(&extract_trigrams(query)))
    }

    pub fn contains(&self, gram: &str, doc_id: DocumentId) -> bool {
        self.grams
            .get(gram)
            .map(|docs| docs.contains(doc_id))
            .unwrap_or(false)
    }

    /// Every document referenced by a trigram entry
    pub fn referenced_documents(&self) -> BTreeSet<DocumentId> {
        let mut all = RoaringTreemap::new();
        for entry in self.grams.iter() {
            all |= entry.value();
        }
        all.iter().collect()
    }

    /// Distinct trigrams indexed
    pub fn len(&self) -> usize {
        self.grams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }
}
