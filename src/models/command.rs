use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentId};

/// Write operations a collaborator can queue against the engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Command {
    IndexDocument(Document),
    UpdateDocument {
        id: DocumentId,
        content: String,
        modified_at: u64,
    },
    RemoveDocument(DocumentId),
    BatchIndex(Vec<Document>),
    Reindex {
        resume_after: Option<DocumentId>,
    },
}

/// What an upsert did to the stored document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexOutcome {
    Created,
    Updated,
    /// Content identical to the stored version; nothing was rewritten
    Unchanged,
}

/// Result of applying a [`Command`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Indexed(IndexOutcome),
    Removed(bool),
    Batch(BatchReport),
    Reindexed(ReindexReport),
}

/// Per-document results of a batch index call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Documents whose synchronization was rejected, with the reason
    pub failed: Vec<(DocumentId, String)>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: IndexOutcome) {
        match outcome {
            IndexOutcome::Created => self.created += 1,
            IndexOutcome::Updated => self.updated += 1,
            IndexOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Progress of a full-corpus reindex.
///
/// Feed `last_completed` back as `resume_after` to continue an interrupted run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub processed: usize,
    pub failed: Vec<(DocumentId, String)>,
    pub last_completed: Option<DocumentId>,
}

impl Command {
    /// Get a human-readable name for this command (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Command::IndexDocument(_) => "IndexDocument",
            Command::UpdateDocument { .. } => "UpdateDocument",
            Command::RemoveDocument(_) => "RemoveDocument",
            Command::BatchIndex(_) => "BatchIndex",
            Command::Reindex { .. } => "Reindex",
        }
    }
}
