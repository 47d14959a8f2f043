use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use super::indexer::index_parallel;
use super::snapshot::EngineSnapshot;
use super::store::{DocumentSlot, DocumentStore, StoredDocument, Visibility};
use super::synchronizer::VectorSynchronizer;
use crate::config::{EngineConfig, HighlightOptions};
use crate::error::{LexisError, Result};
use crate::index::trigram::similarity as trigram_similarity;
use crate::index::{Generation, InvertedIndex, TrigramIndex};
use crate::models::*;
use crate::query::{Highlighter, QueryExecutor};
use crate::tokenizer::{Profile, ProfileSelector, Tokenizer};

/// Progress is logged every this many documents during a reindex
const REINDEX_LOG_INTERVAL: usize = 1000;

/// Point-in-time counters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineStats {
    pub documents: usize,
    /// Removed ids still holding a generation counter
    pub tombstones: usize,
    pub lexemes: BTreeMap<Profile, usize>,
    pub trigrams: usize,
}

/// Full-text and fuzzy search engine over an in-memory corpus.
///
/// Writers to the same document are serialized by that document's slot
/// lock; writers to different documents and all readers run concurrently.
/// A write stages postings under a fresh generation, publishes the new
/// version, then retires the old generation, so queries always evaluate a
/// document against exactly one complete version.
pub struct SearchEngine {
    config: EngineConfig,
    tokenizer: Arc<Tokenizer>,
    synchronizer: VectorSynchronizer,
    store: DocumentStore,
    inverted: InvertedIndex,
    trigrams: TrigramIndex,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Arc::new(Tokenizer::new(&config.tokenizer, &config.profiles));
        let synchronizer = VectorSynchronizer::new(tokenizer.clone(), &config.profiles);
        let inverted = InvertedIndex::new(&config.profiles);

        info!(profiles = ?config.profiles, threshold = config.fuzzy.threshold, "search engine created");
        Ok(Self {
            config,
            tokenizer,
            synchronizer,
            store: DocumentStore::new(),
            inverted,
            trigrams: TrigramIndex::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Create or replace a document
    pub fn index_document(&self, document: Document) -> Result<IndexOutcome> {
        self.write(document, false)
    }

    /// Decode raw content as UTF-8 and index it
    pub fn index_bytes(&self, id: DocumentId, bytes: &[u8], modified_at: u64) -> Result<IndexOutcome> {
        let content = self.tokenizer.decode(bytes)?;
        self.index_document(Document::new(id, content).with_modified_at(modified_at))
    }

    /// Replace the content of an existing document
    pub fn update_document(
        &self,
        id: DocumentId,
        content: impl Into<String>,
        modified_at: u64,
    ) -> Result<IndexOutcome> {
        self.write(Document::new(id, content).with_modified_at(modified_at), true)
    }

    /// Remove a document and every index entry derived from it.
    ///
    /// Returns `false` when the document does not exist.
    pub fn remove_document(&self, id: DocumentId) -> Result<bool> {
        let Some(slot) = self.store.existing_slot(id) else {
            return Ok(false);
        };
        let _guard = slot.lock();
        let Some(previous) = self.store.publish(&slot, None) else {
            return Ok(false);
        };

        for profile in self.synchronizer.profiles() {
            self.inverted.remove(id, *profile)?;
        }
        self.trigrams.remove(id);
        info!(doc_id = id, generation = previous.generation, "document removed");
        Ok(true)
    }

    fn write(&self, document: Document, must_exist: bool) -> Result<IndexOutcome> {
        let id = document.id;
        // A first write is synchronized before its slot exists, so rejected
        // content never leaves a tombstone behind.
        let mut prepared = None;
        let slot = match self.store.existing_slot(id) {
            Some(slot) => slot,
            None if must_exist => return Err(LexisError::DocumentNotFound(id)),
            None => {
                prepared = Some(self.synchronizer.sync_document(&document)?);
                self.store.slot(id)
            }
        };
        let _guard = slot.lock();
        let previous = slot.live();

        match &previous {
            None if must_exist => return Err(LexisError::DocumentNotFound(id)),
            Some(current) if current.document.content == document.content => {
                if current.document.modified_at != document.modified_at {
                    let refreshed = StoredDocument {
                        document,
                        generation: current.generation,
                        vectors: current.vectors.clone(),
                    };
                    self.store.publish(&slot, Some(Arc::new(refreshed)));
                }
                debug!(doc_id = id, "content unchanged, skipping reindex");
                return Ok(IndexOutcome::Unchanged);
            }
            _ => {}
        }

        let vectors = match prepared {
            Some(vectors) => vectors,
            None => self.synchronizer.sync_document(&document)?,
        };
        let generation = self.commit(&slot, document, vectors)?;

        let outcome = if previous.is_some() {
            IndexOutcome::Updated
        } else {
            IndexOutcome::Created
        };
        debug!(doc_id = id, generation, ?outcome, "document indexed");
        Ok(outcome)
    }

    /// Stage, publish and retire one document version.
    ///
    /// Must be called with the slot's writer lock held.
    fn commit(
        &self,
        slot: &DocumentSlot,
        document: Document,
        vectors: DocumentVectors,
    ) -> Result<Generation> {
        let id = document.id;
        let generation = slot.next_generation();

        for (profile, vector) in vectors.iter() {
            if let Err(e) = self.inverted.insert(id, generation, profile, vector) {
                for staged in vectors.profiles() {
                    if let Err(rollback) = self.inverted.discard(id, staged, generation) {
                        warn!(
                            doc_id = id,
                            generation,
                            error = %rollback,
                            "failed to discard staged postings"
                        );
                    }
                }
                return Err(e);
            }
        }
        self.trigrams.insert(id, generation, &document.content);

        let stored = StoredDocument {
            document,
            generation,
            vectors: Arc::new(vectors),
        };
        self.store.publish(slot, Some(Arc::new(stored)));

        for profile in self.synchronizer.profiles() {
            self.inverted.retire(id, *profile, generation)?;
        }
        self.trigrams.retire(id, generation);
        Ok(generation)
    }

    /// Index many documents in parallel
    pub fn index_batch(&self, documents: Vec<Document>) -> BatchReport {
        let total = documents.len();
        let report = index_parallel(self, documents, self.config.reindex_workers);
        info!(
            documents = total,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "batch indexed"
        );
        report
    }

    /// Re-derive vectors and index entries of every stored document.
    ///
    /// Documents are processed in id order, each in its own exclusive
    /// section; pass the returned `last_completed` as `resume_after` to
    /// continue an interrupted run.
    pub fn reindex_all(&self, resume_after: Option<DocumentId>) -> ReindexReport {
        let ids: Vec<DocumentId> = self
            .store
            .live_ids()
            .into_iter()
            .filter(|id| resume_after.map_or(true, |after| *id > after))
            .collect();
        info!(documents = ids.len(), ?resume_after, "reindex started");

        let mut report = ReindexReport {
            last_completed: resume_after,
            ..Default::default()
        };
        for id in ids {
            match self.resync(id) {
                Ok(true) => report.processed += 1,
                Ok(false) => debug!(doc_id = id, "document removed during reindex"),
                Err(e) => {
                    warn!(doc_id = id, error = %e, "reindex failed for document");
                    report.failed.push((id, e.to_string()));
                }
            }
            report.last_completed = Some(id);
            if report.processed > 0 && report.processed % REINDEX_LOG_INTERVAL == 0 {
                info!(processed = report.processed, last = id, "reindex progress");
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed.len(),
            "reindex finished"
        );
        report
    }

    fn resync(&self, id: DocumentId) -> Result<bool> {
        let Some(slot) = self.store.existing_slot(id) else {
            return Ok(false);
        };
        let _guard = slot.lock();
        let Some(current) = slot.live() else {
            return Ok(false);
        };
        let vectors = self.synchronizer.sync_document(&current.document)?;
        self.commit(&slot, current.document.clone(), vectors)?;
        Ok(true)
    }

    /// Run a ranked query
    pub fn search(
        &self,
        query: &str,
        profiles: impl Into<ProfileSelector>,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<ScoredResult>> {
        let request = SearchRequest::new(query)
            .with_profiles(profiles)
            .with_mode(mode)
            .with_limit(limit);
        self.execute(&request)
    }

    pub fn execute(&self, request: &SearchRequest) -> Result<Vec<ScoredResult>> {
        let executor = QueryExecutor::new(
            &self.tokenizer,
            &self.inverted,
            &self.trigrams,
            &self.store,
            &self.config.fuzzy,
            &self.config.profiles,
        );
        let limit = request.limit.unwrap_or(self.config.default_limit);
        let results = executor.search(request, limit)?;
        debug!(query = %request.query, limit, hits = results.len(), "search completed");
        Ok(results)
    }

    /// Mark matched positions in `content` with the given delimiters
    pub fn highlight(
        &self,
        doc_id: DocumentId,
        content: &str,
        positions: &[u32],
        delimiters: (&str, &str),
    ) -> Result<String> {
        let options = self
            .config
            .highlight
            .clone()
            .with_delimiters(delimiters.0, delimiters.1);
        self.highlight_with(doc_id, content, positions, &options)
    }

    /// Like [`SearchEngine::highlight`] with explicit options, which are
    /// validated first.
    pub fn highlight_with(
        &self,
        doc_id: DocumentId,
        content: &str,
        positions: &[u32],
        options: &HighlightOptions,
    ) -> Result<String> {
        options.validate()?;
        let _span = info_span!("highlight", doc_id).entered();
        Ok(Highlighter::new(&self.tokenizer).highlight(content, positions, options))
    }

    /// Headline of a search hit rendered from the stored content
    pub fn headline(&self, result: &ScoredResult) -> Result<String> {
        let stored = self
            .store
            .get(result.doc_id)
            .ok_or(LexisError::DocumentNotFound(result.doc_id))?;
        self.highlight_with(
            result.doc_id,
            &stored.document.content,
            &result.positions,
            &self.config.highlight,
        )
    }

    /// Apply a queued write command
    pub fn apply(&self, command: Command) -> Result<CommandOutcome> {
        debug!(command = command.name(), "applying command");
        match command {
            Command::IndexDocument(document) => {
                self.index_document(document).map(CommandOutcome::Indexed)
            }
            Command::UpdateDocument {
                id,
                content,
                modified_at,
            } => self
                .update_document(id, content, modified_at)
                .map(CommandOutcome::Indexed),
            Command::RemoveDocument(id) => self.remove_document(id).map(CommandOutcome::Removed),
            Command::BatchIndex(documents) => Ok(CommandOutcome::Batch(self.index_batch(documents))),
            Command::Reindex { resume_after } => {
                Ok(CommandOutcome::Reindexed(self.reindex_all(resume_after)))
            }
        }
    }

    pub fn get_document(&self, id: DocumentId) -> Option<Document> {
        self.store.get(id).map(|stored| stored.document.clone())
    }

    /// Token vectors of the published version of a document
    pub fn vectors(&self, id: DocumentId) -> Option<Arc<DocumentVectors>> {
        self.store.get(id).map(|stored| stored.vectors.clone())
    }

    /// Trigram similarity of the published version of a document to `query`
    pub fn similarity(&self, id: DocumentId, query: &str) -> Option<f32> {
        let stored = self.store.get(id)?;
        self.trigrams
            .similarity(id, stored.generation, query)
            .or_else(|| Some(trigram_similarity(&stored.document.content, query)))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> EngineStats {
        let documents = self.store.len();
        EngineStats {
            documents,
            tombstones: self.store.slot_count().saturating_sub(documents),
            lexemes: self
                .inverted
                .profiles()
                .map(|p| (p, self.inverted.lexeme_count(p)))
                .collect(),
            trigrams: self.trigrams.len(),
        }
    }

    /// Check that every index entry belongs to a stored document version and
    /// every published version is fully indexed.
    pub fn verify(&self) -> Result<()> {
        let mut referenced: BTreeSet<DocumentId> = self.inverted.referenced_documents();
        referenced.extend(self.trigrams.referenced_documents());

        for id in referenced {
            match self.store.visibility(id) {
                Visibility::Unknown => {
                    return Err(LexisError::IndexCorruption(format!(
                        "index references unknown document {}",
                        id
                    )))
                }
                Visibility::Hidden => self.verify_removed(id)?,
                Visibility::Live(_) => {}
            }
        }

        for id in self.store.live_ids() {
            self.verify_live(id)?;
        }
        Ok(())
    }

    fn verify_removed(&self, id: DocumentId) -> Result<()> {
        let Some(slot) = self.store.existing_slot(id) else {
            return Ok(());
        };
        let _guard = slot.lock();
        if slot.live().is_some() {
            return Ok(());
        }
        let staged = self
            .inverted
            .profiles()
            .any(|p| !self.inverted.generations(id, p).is_empty())
            || !self.trigrams.generations(id).is_empty();
        if staged {
            return Err(LexisError::IndexCorruption(format!(
                "removed document {} is still indexed",
                id
            )));
        }
        Ok(())
    }

    fn verify_live(&self, id: DocumentId) -> Result<()> {
        let Some(slot) = self.store.existing_slot(id) else {
            return Ok(());
        };
        let _guard = slot.lock();
        let Some(doc) = slot.live() else {
            return Ok(());
        };

        for (profile, vector) in doc.vectors.iter() {
            for lexeme in vector.lexemes() {
                if !self
                    .inverted
                    .contains_version(lexeme, profile, id, doc.generation)
                {
                    return Err(LexisError::IndexCorruption(format!(
                        "document {} is missing its '{}' posting under {}",
                        id, lexeme, profile
                    )));
                }
            }
            if self.inverted.generations(id, profile) != [doc.generation] {
                return Err(LexisError::IndexCorruption(format!(
                    "document {} holds stale postings under {}",
                    id, profile
                )));
            }
        }
        if self.trigrams.generations(id) != [doc.generation] {
            return Err(LexisError::IndexCorruption(format!(
                "document {} trigram entries do not match generation {}",
                id, doc.generation
            )));
        }
        Ok(())
    }

    /// Capture the live documents and configuration
    pub fn snapshot(&self) -> EngineSnapshot {
        let documents = self
            .store
            .live_documents()
            .iter()
            .map(|stored| stored.document.clone())
            .collect();
        EngineSnapshot::new(self.config.clone(), documents)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        snapshot.write_to(path)?;
        info!(documents = snapshot.documents.len(), path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Build an engine from a snapshot file.
    ///
    /// `config` overrides the configuration stored in the snapshot.
    pub fn open_snapshot(path: impl AsRef<Path>, config: Option<EngineConfig>) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = EngineSnapshot::read_from(path)?;
        let engine = Self::new(config.unwrap_or_else(|| snapshot.config.clone()))?;
        let report = engine.restore(snapshot);
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "some snapshot documents could not be indexed");
        }
        info!(documents = engine.len(), path = %path.display(), "snapshot loaded");
        Ok(engine)
    }

    /// Replace the corpus with the snapshot's documents
    pub fn restore(&self, snapshot: EngineSnapshot) -> BatchReport {
        self.replace_all(snapshot.documents)
    }

    /// Make `documents` the whole corpus: ids missing from it are removed,
    /// the rest are upserted, so unchanged documents are not rewritten.
    pub fn replace_all(&self, documents: Vec<Document>) -> BatchReport {
        let keep: BTreeSet<DocumentId> = documents.iter().map(|d| d.id).collect();
        for id in self.store.live_ids() {
            if !keep.contains(&id) {
                if let Err(e) = self.remove_document(id) {
                    warn!(doc_id = id, error = %e, "failed to drop document");
                }
            }
        }
        self.index_batch(documents)
    }
}
