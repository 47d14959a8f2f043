use std::cmp::{Ordering, Reverse};
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use ordered_float::OrderedFloat;
use roaring::RoaringTreemap;
use tracing::{debug, error};

use super::ranking::{combined_score, cover_density, matched_positions};
use crate::config::FuzzyConfig;
use crate::engine::store::{DocumentStore, StoredDocument, Visibility};
use crate::error::{LexisError, Result};
use crate::index::trigram::{self, extract_trigrams, TrigramSet};
use crate::index::{InvertedIndex, PostingList, TrigramIndex};
use crate::models::{DocumentId, ScoredResult, SearchMode, SearchRequest};
use crate::tokenizer::{Profile, Tokenizer};

/// Candidate before final ordering
struct Hit {
    score: f32,
    positions: Vec<u32>,
    profile: Option<Profile>,
    doc: Arc<StoredDocument>,
}

/// Read-only view over the index structures that answers search requests.
///
/// Every candidate is evaluated against the single document version it
/// resolves to in the store, so a concurrent update is seen either entirely
/// or not at all.
pub struct QueryExecutor<'a> {
    tokenizer: &'a Tokenizer,
    inverted: &'a InvertedIndex,
    trigrams: &'a TrigramIndex,
    store: &'a DocumentStore,
    fuzzy: &'a FuzzyConfig,
    enabled: &'a [Profile],
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        tokenizer: &'a Tokenizer,
        inverted: &'a InvertedIndex,
        trigrams: &'a TrigramIndex,
        store: &'a DocumentStore,
        fuzzy: &'a FuzzyConfig,
        enabled: &'a [Profile],
    ) -> Self {
        Self {
            tokenizer,
            inverted,
            trigrams,
            store,
            fuzzy,
            enabled,
        }
    }

    /// Answer `request`, keeping at most `limit` results.
    pub fn search(&self, request: &SearchRequest, limit: usize) -> Result<Vec<ScoredResult>> {
        let profiles = request.profiles.resolve(self.enabled)?;
        if limit == 0 || request.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hits = match request.mode {
            SearchMode::Exact => self.exact(&request.query, &profiles)?,
            SearchMode::Fuzzy => self.fuzzy(&request.query)?,
            SearchMode::Combined => {
                let exact = self.exact(&request.query, &profiles)?;
                let fuzzy = self.fuzzy(&request.query)?;
                self.combine(exact, fuzzy)
            }
        };

        debug!(
            query = %request.query,
            mode = ?request.mode,
            profiles = ?profiles,
            candidates = hits.len(),
            "search evaluated"
        );
        Ok(self.collect_top_k(hits, limit, &request.query))
    }

    /// Stemmed match across profiles; the best profile score wins
    fn exact(&self, query: &str, profiles: &[Profile]) -> Result<HashMap<DocumentId, Hit>> {
        let mut best: HashMap<DocumentId, Hit> = HashMap::new();
        for profile in profiles {
            for (doc_id, hit) in self.exact_profile(query, *profile)? {
                match best.entry(doc_id) {
                    Entry::Occupied(mut current) => {
                        if hit.score > current.get().score {
                            current.insert(hit);
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(hit);
                    }
                }
            }
        }
        Ok(best)
    }

    fn exact_profile(&self, query: &str, profile: Profile) -> Result<HashMap<DocumentId, Hit>> {
        let lexemes = self.tokenizer.query_lexemes(query, profile)?;
        if lexemes.is_empty() {
            return Ok(HashMap::new());
        }

        // AND semantics: intersect candidate ids lexeme by lexeme
        let mut lists: Vec<PostingList> = Vec::with_capacity(lexemes.len());
        let mut candidates: Option<RoaringTreemap> = None;
        for lexeme in &lexemes {
            let list = self.inverted.lookup(lexeme, profile)?;
            let ids = list.doc_ids();
            let narrowed = match candidates.take() {
                Some(current) => current & ids,
                None => ids,
            };
            if narrowed.is_empty() {
                return Ok(HashMap::new());
            }
            candidates = Some(narrowed);
            lists.push(list);
        }

        let mut hits = HashMap::new();
        for doc_id in candidates.unwrap_or_default().iter() {
            let Some(doc) = self.resolve(doc_id, || {
                self.inverted.contains(&lexemes[0], profile, doc_id)
            })?
            else {
                continue;
            };

            let mut term_positions = Vec::with_capacity(lexemes.len());
            for (lexeme, list) in lexemes.iter().zip(&lists) {
                let positions = match list.get(doc_id, doc.generation) {
                    Some(posting) => posting.positions.clone(),
                    // postings of the published version were not staged yet
                    // when the list was read; fall back to its vector
                    None => doc
                        .vectors
                        .get(profile)
                        .map(|v| v.positions_of(lexeme))
                        .unwrap_or_default(),
                };
                if positions.is_empty() {
                    break;
                }
                term_positions.push(positions);
            }
            if term_positions.len() < lexemes.len() {
                continue;
            }

            hits.insert(
                doc_id,
                Hit {
                    score: cover_density(&term_positions),
                    positions: matched_positions(&term_positions),
                    profile: Some(profile),
                    doc,
                },
            );
        }
        Ok(hits)
    }

    /// Trigram similarity over raw content, no stemming
    fn fuzzy(&self, query: &str) -> Result<HashMap<DocumentId, Hit>> {
        let query_set = extract_trigrams(query);
        if query_set.is_empty() {
            return Ok(HashMap::new());
        }

        let mut hits = HashMap::new();
        for doc_id in self.trigrams.candidates(&query_set).iter() {
            let Some(doc) = self.resolve(doc_id, || {
                query_set.grams().any(|gram| self.trigrams.contains(gram, doc_id))
            })?
            else {
                continue;
            };
            let similarity = match self.trigrams.version(doc_id, doc.generation) {
                Some(set) => set.similarity(&query_set),
                None => extract_trigrams(&doc.document.content).similarity(&query_set),
            };
            if similarity > self.fuzzy.threshold {
                hits.insert(
                    doc_id,
                    Hit {
                        score: similarity,
                        positions: Vec::new(),
                        profile: None,
                        doc,
                    },
                );
            }
        }
        Ok(hits)
    }

    fn combine(
        &self,
        exact: HashMap<DocumentId, Hit>,
        mut fuzzy: HashMap<DocumentId, Hit>,
    ) -> HashMap<DocumentId, Hit> {
        let weight = self.fuzzy.combined_weight;
        let mut merged = HashMap::with_capacity(exact.len() + fuzzy.len());
        for (doc_id, mut hit) in exact {
            let fuzzy_score = fuzzy.remove(&doc_id).map(|f| f.score);
            hit.score = combined_score(Some(hit.score), fuzzy_score, weight);
            merged.insert(doc_id, hit);
        }
        for (doc_id, mut hit) in fuzzy {
            hit.score = combined_score(None, Some(hit.score), weight);
            merged.insert(doc_id, hit);
        }
        merged
    }

    /// Map an indexed id to its published version.
    ///
    /// A hidden document is either being written for the first time or
    /// being removed; its writer lock is taken to wait that write out, and if
    /// the document is still hidden while `still_indexed` reports entries
    /// for it, the removal left residue behind. An id the store has never
    /// seen means the index holds an entry no write could have produced.
    fn resolve(
        &self,
        doc_id: DocumentId,
        still_indexed: impl Fn() -> bool,
    ) -> Result<Option<Arc<StoredDocument>>> {
        match self.store.visibility(doc_id) {
            Visibility::Live(doc) => Ok(Some(doc)),
            Visibility::Hidden => {
                let Some(slot) = self.store.existing_slot(doc_id) else {
                    return Ok(None);
                };
                let _guard = slot.lock();
                if slot.live().is_none() && still_indexed() {
                    error!(doc_id, "index entry references a removed document");
                    return Err(LexisError::IndexCorruption(format!(
                        "index references removed document {}",
                        doc_id
                    )));
                }
                Ok(None)
            }
            Visibility::Unknown => {
                error!(doc_id, "index entry references a document that was never stored");
                Err(LexisError::IndexCorruption(format!(
                    "index references unknown document {}",
                    doc_id
                )))
            }
        }
    }

    fn collect_top_k(
        &self,
        hits: HashMap<DocumentId, Hit>,
        top_k: usize,
        query: &str,
    ) -> Vec<ScoredResult> {
        if top_k == 0 || hits.is_empty() {
            return Vec::new();
        }

        // Higher score first, then lower id
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        struct ScoreEntry {
            score: OrderedFloat<f32>,
            doc_id: DocumentId,
        }

        impl Ord for ScoreEntry {
            fn cmp(&self, other: &Self) -> Ordering {
                self.score
                    .cmp(&other.score)
                    .then_with(|| other.doc_id.cmp(&self.doc_id))
            }
        }

        impl PartialOrd for ScoreEntry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut heap: BinaryHeap<Reverse<ScoreEntry>> = BinaryHeap::new();
        for (doc_id, hit) in &hits {
            let entry = ScoreEntry {
                score: OrderedFloat(hit.score),
                doc_id: *doc_id,
            };
            if heap.len() < top_k {
                heap.push(Reverse(entry));
            } else if let Some(min) = heap.peek() {
                if entry > min.0 {
                    heap.pop();
                    heap.push(Reverse(entry));
                }
            }
        }

        let mut entries: Vec<ScoreEntry> = heap.into_iter().map(|Reverse(e)| e).collect();
        entries.sort_by(|a, b| b.cmp(a));

        let mut hits = hits;
        let mut query_words: Option<Vec<TrigramSet>> = None;
        entries
            .into_iter()
            .filter_map(|entry| hits.remove(&entry.doc_id))
            .map(|hit| {
                let positions = if hit.positions.is_empty() {
                    let words = query_words
                        .get_or_insert_with(|| trigram::words(query).map(extract_trigrams).collect());
                    self.fuzzy_positions(&hit.doc.document.content, words)
                } else {
                    hit.positions
                };
                let mut result = ScoredResult::new(hit.doc.document.id, hit.score)
                    .with_positions(positions);
                result.profile = hit.profile;
                result
            })
            .collect()
    }

    /// Positions of content words similar enough to some query word
    fn fuzzy_positions(&self, content: &str, query_words: &[TrigramSet]) -> Vec<u32> {
        if query_words.is_empty() {
            return Vec::new();
        }
        self.tokenizer
            .segment(content)
            .into_iter()
            .filter(|unit| {
                let grams = extract_trigrams(unit.text);
                query_words
                    .iter()
                    .any(|q| q.similarity(&grams) >= self.fuzzy.threshold)
            })
            .map(|unit| unit.position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::models::{Document, DocumentVectors, Token, TokenVector};

    struct Fixture {
        tokenizer: Tokenizer,
        inverted: InvertedIndex,
        trigrams: TrigramIndex,
        store: DocumentStore,
        fuzzy: FuzzyConfig,
        profiles: Vec<Profile>,
    }

    impl Fixture {
        fn new() -> Self {
            let profiles = vec![Profile::Simple];
            Self {
                tokenizer: Tokenizer::new(&TokenizerConfig::default(), &profiles),
                inverted: InvertedIndex::new(&profiles),
                trigrams: TrigramIndex::new(),
                store: DocumentStore::new(),
                fuzzy: FuzzyConfig::default(),
                profiles,
            }
        }

        fn executor(&self) -> QueryExecutor<'_> {
            QueryExecutor::new(
                &self.tokenizer,
                &self.inverted,
                &self.trigrams,
                &self.store,
                &self.fuzzy,
                &self.profiles,
            )
        }

        fn stage(&self, doc_id: DocumentId, generation: u64, word: &str) {
            let vector = TokenVector::new(vec![Token::new(word, 1)]);
            self.inverted
                .insert(doc_id, generation, Profile::Simple, &vector)
                .unwrap();
            self.trigrams.insert(doc_id, generation, word);
        }

        fn publish(&self, doc_id: DocumentId, word: &str) {
            let slot = self.store.slot(doc_id);
            let generation = slot.next_generation();
            self.stage(doc_id, generation, word);
            let vector = TokenVector::new(vec![Token::new(word, 1)]);
            let vectors = DocumentVectors::new([(Profile::Simple, vector)].into_iter().collect());
            self.store.publish(
                &slot,
                Some(Arc::new(StoredDocument {
                    document: Document::new(doc_id, word),
                    generation,
                    vectors: Arc::new(vectors),
                })),
            );
        }
    }

    fn request(query: &str, mode: SearchMode) -> SearchRequest {
        SearchRequest::new(query)
            .with_profiles(Profile::Simple)
            .with_mode(mode)
    }

    #[test]
    fn test_unknown_document_is_corruption() {
        let fixture = Fixture::new();
        fixture.publish(1, "orphan");
        fixture.stage(99, 1, "orphan");

        let err = fixture
            .executor()
            .search(&request("orphan", SearchMode::Exact), 10)
            .unwrap_err();
        assert!(err.is_corruption());

        let err = fixture
            .executor()
            .search(&request("orphan", SearchMode::Fuzzy), 10)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_residue_of_removed_document_is_corruption() {
        let fixture = Fixture::new();
        fixture.publish(1, "ghost");
        let slot = fixture.store.slot(1);
        fixture.store.publish(&slot, None);

        let err = fixture
            .executor()
            .search(&request("ghost", SearchMode::Exact), 10)
            .unwrap_err();
        assert!(matches!(err, LexisError::IndexCorruption(msg) if msg.contains("removed")));
    }

    #[test]
    fn test_unpublished_generation_is_invisible() {
        let fixture = Fixture::new();
        fixture.publish(1, "stable");
        // staged but not yet published
        fixture.stage(1, 2, "pending");

        let hits = fixture
            .executor()
            .search(&request("pending", SearchMode::Exact), 10)
            .unwrap();
        assert!(hits.is_empty());

        let hits = fixture
            .executor()
            .search(&request("stable", SearchMode::Exact), 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_zero_limit_and_blank_query() {
        let fixture = Fixture::new();
        fixture.publish(1, "word");
        let executor = fixture.executor();
        assert!(executor
            .search(&request("word", SearchMode::Exact), 0)
            .unwrap()
            .is_empty());
        assert!(executor
            .search(&request("   ", SearchMode::Combined), 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_disabled_profile_rejected_before_work() {
        let fixture = Fixture::new();
        let err = fixture
            .executor()
            .search(&SearchRequest::new("word").with_profiles(Profile::RussianUnaccent), 10)
            .unwrap_err();
        assert!(matches!(err, LexisError::InvalidProfile(_)));
    }
}
