//! Live document table
//!
//! Each document id owns a slot holding a writer lock and the currently
//! published version. Slots are never removed: a removed document leaves a
//! tombstone that keeps its generation counter, so generations of one id
//! never repeat and an index entry whose id has no slot at all can only be
//! the result of corruption.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::index::Generation;
use crate::models::{Document, DocumentId, DocumentVectors};

/// One published document version together with its token vectors
#[derive(Debug)]
pub struct StoredDocument {
    pub document: Document,
    pub generation: Generation,
    pub vectors: Arc<DocumentVectors>,
}

#[derive(Debug, Default)]
struct SlotState {
    /// Last generation handed out for this id
    generation: Generation,
    live: Option<Arc<StoredDocument>>,
}

/// Per-document writer lock plus the published version
#[derive(Debug, Default)]
pub struct DocumentSlot {
    writer: Mutex<()>,
    state: RwLock<SlotState>,
}

impl DocumentSlot {
    /// Serialize writers of this document
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    pub fn live(&self) -> Option<Arc<StoredDocument>> {
        self.state.read().live.clone()
    }

    /// Reserve the next generation number
    pub fn next_generation(&self) -> Generation {
        let mut state = self.state.write();
        state.generation += 1;
        state.generation
    }

    fn swap(&self, live: Option<Arc<StoredDocument>>) -> Option<Arc<StoredDocument>> {
        std::mem::replace(&mut self.state.write().live, live)
    }
}

/// What a reader sees for a document id
#[derive(Debug, Clone)]
pub enum Visibility {
    Live(Arc<StoredDocument>),
    /// Known id with no published version (removed, or first write in flight)
    Hidden,
    /// Id never written
    Unknown,
}

/// Concurrent map of document slots
#[derive(Debug, Default)]
pub struct DocumentStore {
    slots: DashMap<DocumentId, Arc<DocumentSlot>>,
    live_count: AtomicUsize,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot of a document
    pub fn slot(&self, id: DocumentId) -> Arc<DocumentSlot> {
        self.slots.entry(id).or_default().clone()
    }

    pub fn existing_slot(&self, id: DocumentId) -> Option<Arc<DocumentSlot>> {
        self.slots.get(&id).map(|s| s.clone())
    }

    /// Publish a version, or hide the document with `None`.
    ///
    /// Must be called with the slot's writer lock held.
    pub fn publish(
        &self,
        slot: &DocumentSlot,
        live: Option<Arc<StoredDocument>>,
    ) -> Option<Arc<StoredDocument>> {
        let now_live = live.is_some();
        let previous = slot.swap(live);
        match (previous.is_some(), now_live) {
            (false, true) => {
                self.live_count.fetch_add(1, Ordering::SeqCst);
            }
            (true, false) => {
                self.live_count.fetch_sub(1, Ordering::SeqCst);
            }
            _ => {}
        }
        previous
    }

    pub fn visibility(&self, id: DocumentId) -> Visibility {
        match self.slots.get(&id) {
            Some(slot) => match slot.live() {
                Some(doc) => Visibility::Live(doc),
                None => Visibility::Hidden,
            },
            None => Visibility::Unknown,
        }
    }

    pub fn get(&self, id: DocumentId) -> Option<Arc<StoredDocument>> {
        self.slots.get(&id).and_then(|slot| slot.live())
    }

    /// Ids of published documents, ascending
    pub fn live_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self
            .slots
            .iter()
            .filter(|entry| entry.value().live().is_some())
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Published documents ordered by id
    pub fn live_documents(&self) -> Vec<Arc<StoredDocument>> {
        let mut docs: Vec<Arc<StoredDocument>> = self
            .slots
            .iter()
            .filter_map(|entry| entry.value().live())
            .collect();
        docs.sort_unstable_by_key(|d| d.document.id);
        docs
    }

    pub fn len(&self) -> usize {
        self.live_count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots including tombstones
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
