use std::collections::BTreeMap;

use crossbeam::channel;
use tracing::{debug, warn};

use super::SearchEngine;
use crate::error::Result;
use crate::models::{BatchReport, Document, DocumentId, IndexOutcome};

/// Index documents on a pool of scoped worker threads.
///
/// Each document is written in its own exclusive section, so workers only
/// contend when they touch the same index keys. When a batch names the same
/// id more than once, the last occurrence wins.
pub fn index_parallel(engine: &SearchEngine, documents: Vec<Document>, workers: usize) -> BatchReport {
    let mut latest: BTreeMap<DocumentId, Document> = BTreeMap::new();
    for doc in documents {
        latest.insert(doc.id, doc);
    }
    let workers = workers.clamp(1, latest.len().max(1));

    let (tx, rx) = channel::unbounded::<Document>();
    for doc in latest.into_values() {
        // receiver is alive until the scope below ends
        let _ = tx.send(doc);
    }
    drop(tx);

    let (result_tx, result_rx) = channel::unbounded::<(DocumentId, Result<IndexOutcome>)>();
    let scope = crossbeam::scope(|scope| {
        for worker in 0..workers {
            let rx = rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move |_| {
                let mut done = 0usize;
                while let Ok(doc) = rx.recv() {
                    let id = doc.id;
                    let _ = result_tx.send((id, engine.index_document(doc)));
                    done += 1;
                }
                debug!(worker, documents = done, "batch worker finished");
            });
        }
    });
    if scope.is_err() {
        warn!("a batch indexing worker panicked");
    }
    drop(result_tx);

    let mut results: Vec<(DocumentId, Result<IndexOutcome>)> = result_rx.iter().collect();
    results.sort_by_key(|(id, _)| *id);

    let mut report = BatchReport::default();
    for (id, result) in results {
        match result {
            Ok(outcome) => report.record(outcome),
            Err(e) => report.failed.push((id, e.to_string())),
        }
    }
    report
}
