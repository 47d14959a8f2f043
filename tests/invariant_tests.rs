//! Structural invariants that must hold after any sequence of writes

use lexis::{Document, EngineConfig, IndexOutcome, Profile, ProfileSelector, SearchEngine, SearchMode};

const CORPUS: [(u64, &str); 5] = [
    (1, "Distributed systems replicate state across machines"),
    (2, "Search engines build inverted indexes over documents"),
    (3, "Café owners brew espresso every morning"),
    (4, "Поисковые системы индексируют документы"),
    (5, "Well-known compound words get split into parts"),
];

fn populated_engine() -> SearchEngine {
    populated_engine_with(EngineConfig::default())
}

fn populated_engine_with(config: EngineConfig) -> SearchEngine {
    let engine = SearchEngine::new(config).unwrap();
    for (id, content) in CORPUS {
        engine
            .index_document(Document::new(id, content).with_modified_at(1))
            .unwrap();
    }
    engine
}

#[test]
fn test_reindexing_same_content_is_idempotent() {
    let engine = populated_engine();
    let before = engine.stats();

    for (id, content) in CORPUS {
        let outcome = engine
            .index_document(Document::new(id, content).with_modified_at(2))
            .unwrap();
        assert_eq!(outcome, IndexOutcome::Unchanged);
    }

    assert_eq!(engine.stats(), before);
    assert_eq!(engine.get_document(1).unwrap().modified_at, 2);
    engine.verify().unwrap();
}

#[test]
fn test_vectors_match_tokenizer_output() {
    let engine = populated_engine();
    for (id, content) in CORPUS {
        let vectors = engine.vectors(id).unwrap();
        for profile in Profile::ALL {
            let expected = engine.tokenizer().tokenize(content, profile).unwrap();
            assert_eq!(vectors.get(profile), Some(&expected), "doc {} {}", id, profile);
        }
    }
}

#[test]
fn test_every_lexeme_is_searchable() {
    let engine = populated_engine();
    for (id, content) in CORPUS {
        let words: Vec<&str> = content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        for word in words {
            let results = engine
                .search(word, ProfileSelector::All, SearchMode::Exact, 10)
                .unwrap();
            assert!(
                results.iter().any(|r| r.doc_id == id),
                "word {:?} did not find doc {}",
                word,
                id
            );
        }
    }
}

#[test]
fn test_update_replaces_old_terms() {
    let engine = populated_engine();
    engine
        .update_document(1, "Consensus protocols elect a leader", 3)
        .unwrap();

    assert!(engine
        .search("replicate", ProfileSelector::All, SearchMode::Exact, 10)
        .unwrap()
        .is_empty());
    let results = engine
        .search("leader", ProfileSelector::All, SearchMode::Exact, 10)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc_id, 1);
    engine.verify().unwrap();
}

#[test]
fn test_removal_leaves_no_residue() {
    let engine = populated_engine();
    for (id, _) in CORPUS {
        assert!(engine.remove_document(id).unwrap());
    }
    assert!(!engine.remove_document(1).unwrap());

    let stats = engine.stats();
    assert_eq!(stats.documents, 0);
    assert_eq!(stats.tombstones, CORPUS.len());
    assert!(stats.lexemes.values().all(|count| *count == 0));
    assert_eq!(stats.trigrams, 0);
    engine.verify().unwrap();

    for mode in [SearchMode::Exact, SearchMode::Fuzzy, SearchMode::Combined] {
        assert!(engine
            .search("systems", ProfileSelector::All, mode, 10)
            .unwrap()
            .is_empty());
    }
    assert!(engine.get_document(2).is_none());
}

#[test]
fn test_reinsert_after_removal() {
    let engine = populated_engine();
    engine.remove_document(2).unwrap();
    let outcome = engine
        .index_document(Document::new(2, "Search engines build inverted indexes over documents"))
        .unwrap();
    assert_eq!(outcome, IndexOutcome::Created);
    assert_eq!(
        engine
            .search("inverted", Profile::EnglishUnaccent, SearchMode::Exact, 10)
            .unwrap()[0]
            .doc_id,
        2
    );
    engine.verify().unwrap();
}

#[test]
fn test_fuzzy_results_ignore_profile() {
    let engine = populated_engine_with(EngineConfig::default().with_fuzzy_threshold(0.1));
    let baseline = engine
        .search("distributd sytems", Profile::EnglishUnaccent, SearchMode::Fuzzy, 10)
        .unwrap();
    assert!(!baseline.is_empty());

    for selector in [
        ProfileSelector::One(Profile::RussianUnaccent),
        ProfileSelector::One(Profile::Simple),
        ProfileSelector::All,
    ] {
        let results = engine
            .search("distributd sytems", selector, SearchMode::Fuzzy, 10)
            .unwrap();
        assert_eq!(results, baseline);
    }
}

#[test]
fn test_search_is_deterministic() {
    let engine = populated_engine();
    let queries = ["systems", "documents indexes", "espresso", "системы"];
    for query in queries {
        for mode in [SearchMode::Exact, SearchMode::Fuzzy, SearchMode::Combined] {
            let first = engine.search(query, ProfileSelector::All, mode, 10).unwrap();
            for _ in 0..5 {
                assert_eq!(
                    engine.search(query, ProfileSelector::All, mode, 10).unwrap(),
                    first
                );
            }
        }
    }
}

#[test]
fn test_reindex_all_preserves_index() {
    let engine = populated_engine();
    let before = engine.stats();
    let report = engine.reindex_all(None);
    assert_eq!(report.processed, CORPUS.len());
    assert!(report.failed.is_empty());
    assert_eq!(report.last_completed, Some(5));
    assert_eq!(engine.stats(), before);
    engine.verify().unwrap();
}
