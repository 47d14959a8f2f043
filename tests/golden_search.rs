use lexis::{Document, EngineConfig, Profile, ProfileSelector, SearchEngine, SearchMode};

fn setup_engine() -> SearchEngine {
    let engine = SearchEngine::new(EngineConfig::default()).unwrap();
    let docs = vec![
        Document::new(1, "rust rust rust programming"),
        Document::new(2, "rust programming language"),
        Document::new(3, "python programming language"),
        Document::new(4, "garden tools"),
    ];
    let report = engine.index_batch(docs);
    assert_eq!(report.created, 4);
    engine
}

fn ids(engine: &SearchEngine, query: &str, mode: SearchMode) -> Vec<u64> {
    engine
        .search(query, Profile::EnglishUnaccent, mode, 10)
        .unwrap()
        .iter()
        .map(|r| r.doc_id)
        .collect()
}

#[test]
fn golden_exact_term_frequency() {
    let engine = setup_engine();
    let results = engine
        .search("rust", Profile::EnglishUnaccent, SearchMode::Exact, 10)
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].doc_id, 1);
    assert!((results[0].score - 0.3).abs() < 1e-6);
    assert_eq!(results[0].positions, vec![1, 2, 3]);
    assert_eq!(results[1].doc_id, 2);
    assert!((results[1].score - 0.1).abs() < 1e-6);
}

#[test]
fn golden_exact_phrase_tie_breaks_on_id() {
    let engine = setup_engine();
    let results = engine
        .search("rust programming", Profile::EnglishUnaccent, SearchMode::Exact, 10)
        .unwrap();

    let ids: Vec<u64> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(results[0].score, results[1].score);
    assert_eq!(results[1].positions, vec![1, 2]);
}

#[test]
fn golden_exact_requires_every_term() {
    let engine = setup_engine();
    assert_eq!(ids(&engine, "programming language", SearchMode::Exact), vec![2, 3]);
    assert_eq!(ids(&engine, "python", SearchMode::Exact), vec![3]);
    assert_eq!(ids(&engine, "garden tool", SearchMode::Exact), vec![4]);
    assert!(ids(&engine, "rust garden", SearchMode::Exact).is_empty());
}

#[test]
fn golden_fuzzy_typo_ranking() {
    let engine = setup_engine();
    // 15/18, 15/27 and 10/33 shared trigrams; the garden doc shares none
    let results = engine
        .search("rust programing", Profile::EnglishUnaccent, SearchMode::Fuzzy, 10)
        .unwrap();
    let ids: Vec<u64> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!((results[0].score - 15.0 / 18.0).abs() < 1e-5);
    assert!(results.iter().all(|r| r.profile.is_none()));
}

#[test]
fn golden_fuzzy_positions_mark_similar_words() {
    let engine = setup_engine();
    let results = engine
        .search("gardens", Profile::EnglishUnaccent, SearchMode::Fuzzy, 10)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc_id, 4);
    assert_eq!(results[0].positions, vec![1]);
}

#[test]
fn golden_combined_adds_fuzzy_to_exact() {
    let engine = setup_engine();
    let exact = engine
        .search("rust programming", ProfileSelector::All, SearchMode::Exact, 10)
        .unwrap();
    let combined = engine
        .search("rust programming", ProfileSelector::All, SearchMode::Combined, 10)
        .unwrap();

    // doc 3 only clears the trigram threshold
    let ids: Vec<u64> = combined.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!((combined[0].score - 1.1).abs() < 1e-5);
    for hit in &exact {
        let boosted = combined.iter().find(|c| c.doc_id == hit.doc_id).unwrap();
        assert!(boosted.score > hit.score);
    }
}

#[test]
fn golden_limit_truncates_after_ordering() {
    let engine = setup_engine();
    let results = engine
        .search("programming", Profile::EnglishUnaccent, SearchMode::Exact, 2)
        .unwrap();
    let ids: Vec<u64> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![1, 2]);
}
