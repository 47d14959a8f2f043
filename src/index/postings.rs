//! Posting lists ordered by document id
//!
//! Each document can hold postings for more than one generation while an
//! update is in flight: the new generation is staged before the old one is
//! retired. Entries are kept sorted by `(doc_id, generation)`.

use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};

use crate::models::DocumentId;

/// Monotonic per-document version number
pub type Generation = u64;

/// One lexeme occurrence record for a document version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocumentId,
    pub generation: Generation,
    /// Ascending word positions
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocumentId, generation: Generation, positions: Vec<u32>) -> Self {
        Self {
            doc_id,
            generation,
            positions,
        }
    }

    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    fn key(&self) -> (DocumentId, Generation) {
        (self.doc_id, self.generation)
    }
}

/// Postings for one lexeme under one profile
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a posting, replacing one with the same document and generation
    pub fn add_posting(&mut self, posting: Posting) {
        match self
            .postings
            .binary_search_by_key(&posting.key(), Posting::key)
        {
            Ok(idx) => self.postings[idx] = posting,
            Err(idx) => self.postings.insert(idx, posting),
        }
    }

    /// Remove postings of a document whose generation matches the predicate
    pub fn remove_document_where(
        &mut self,
        doc_id: DocumentId,
        mut predicate: impl FnMut(Generation) -> bool,
    ) -> usize {
        let before = self.postings.len();
        self.postings
            .retain(|p| p.doc_id != doc_id || !predicate(p.generation));
        before - self.postings.len()
    }

    /// Remove every posting of a document
    pub fn remove_document(&mut self, doc_id: DocumentId) -> usize {
        self.remove_document_where(doc_id, |_| true)
    }

    pub fn get(&self, doc_id: DocumentId, generation: Generation) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&(doc_id, generation), Posting::key)
            .ok()
            .map(|idx| &self.postings[idx])
    }

    pub fn contains_document(&self, doc_id: DocumentId) -> bool {
        let idx = self.postings.partition_point(|p| p.doc_id < doc_id);
        self.postings
            .get(idx)
            .map(|p| p.doc_id == doc_id)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Distinct documents referenced by this list
    pub fn doc_ids(&self) -> RoaringTreemap {
        let mut ids = RoaringTreemap::new();
        for posting in &self.postings {
            ids.insert(posting.doc_id);
        }
        ids
    }
}
