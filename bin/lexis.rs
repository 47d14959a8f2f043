use anyhow::{bail, Context, Result};
use clap::Parser;
use lexis::{
    Document, EngineConfig, HighlightOptions, ProfileSelector, SearchEngine, SearchMode,
};
use std::collections::BTreeMap;
use std::fs;
use jwalk::WalkDir;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["md", "txt"];

#[derive(Parser)]
#[command(name = "lexis")]
#[command(about = "Full-text and fuzzy search over a directory of notes", long_about = None)]
struct Args {
    /// Directory scanned for .md and .txt files
    #[arg(long, env = "LEXIS_DIR")]
    dir: Option<PathBuf>,

    /// Snapshot file loaded at startup when present and saved after indexing
    #[arg(long, env = "LEXIS_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Search query
    #[arg(short, long)]
    query: Option<String>,

    /// Language profile: english, russian, simple or both
    #[arg(short, long, env = "LEXIS_LANG", default_value = "english")]
    lang: String,

    /// Search mode: exact, fuzzy or combined
    #[arg(short, long, env = "LEXIS_MODE", default_value = "exact")]
    mode: String,

    /// Maximum number of results, defaults to the engine's configured limit
    #[arg(short = 'n', long, env = "LEXIS_LIMIT")]
    limit: Option<usize>,

    /// Fuzzy similarity threshold
    #[arg(long, env = "LEXIS_FUZZY_THRESHOLD", default_value = "0.3")]
    threshold: f32,

    /// Mark every match in the full content instead of excerpting
    #[arg(long)]
    highlight_all: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting lexis v{}", lexis::VERSION);

    let profiles: ProfileSelector = args.lang.parse()?;
    let mode: SearchMode = args.mode.parse()?;
    let config = EngineConfig::default()
        .with_fuzzy_threshold(args.threshold)
        .with_highlight(HighlightOptions::default().with_highlight_all(args.highlight_all));

    let engine = match &args.snapshot {
        Some(path) if path.exists() => SearchEngine::open_snapshot(path, Some(config))
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        _ => SearchEngine::new(config)?,
    };

    let mut paths: BTreeMap<u64, String> = BTreeMap::new();
    if let Some(dir) = &args.dir {
        let documents = collect_documents(dir, &engine, &mut paths)?;
        info!("Indexing {} files from {}", documents.len(), dir.display());
        let report = engine.replace_all(documents);
        for (id, reason) in &report.failed {
            warn!("Skipped document {}: {}", id, reason);
        }
        info!(
            "Indexed: {} created, {} updated, {} unchanged",
            report.created, report.updated, report.unchanged
        );
        if let Some(path) = &args.snapshot {
            engine.save_snapshot(path)?;
        }
    }

    let Some(query) = args.query.as_deref() else {
        if args.dir.is_none() {
            bail!("nothing to do: pass --dir to index files or --query to search");
        }
        return Ok(());
    };

    let limit = args.limit.unwrap_or(engine.config().default_limit);
    info!(
        "Searching for: '{}' (Language: {}, Mode: {}, Limit: {})",
        query, args.lang, args.mode, limit
    );
    let results = engine.search(query, profiles, mode, limit)?;
    if results.is_empty() {
        println!("\n--- No results found. ---\n");
        return Ok(());
    }

    println!("\n--- Search Results ---");
    for (i, result) in results.iter().enumerate() {
        let headline = engine.headline(result)?;
        let headline = headline.replace(['\n', '\t'], " ").replace('\r', "");
        let label = paths
            .get(&result.doc_id)
            .cloned()
            .unwrap_or_else(|| format!("document {}", result.doc_id));
        println!("{}. Path: {} (Rank: {:.4})", i + 1, label, result.score);
        println!("   Context: ...{}...", headline);
    }
    println!("--------------------\n");
    Ok(())
}

/// Read every supported file beneath `dir`.
///
/// Files are numbered in path order, so the same tree maps to the same ids
/// across runs and a loaded snapshot only sees the files that changed.
fn collect_documents(
    dir: &Path,
    engine: &SearchEngine,
    paths: &mut BTreeMap<u64, String>,
) -> Result<Vec<Document>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for (id, file) in (1u64..).zip(files) {
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read {}: {}", file.display(), e);
                continue;
            }
        };
        let Ok(text) = engine.tokenizer().decode(&bytes) else {
            warn!("Skipping {}: not valid UTF-8", file.display());
            continue;
        };
        let modified_at = fs::metadata(&file)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());

        paths.insert(id, file.display().to_string());
        documents.push(Document::new(id, text).with_modified_at(modified_at));
    }
    Ok(documents)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    for entry in WalkDir::new(dir).sort(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if supported {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_documents_walks_nested_dirs_in_path_order() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("b").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join("c.md"), "third note").unwrap();
        fs::write(tmp.path().join("a.TXT"), "first note").unwrap();
        fs::write(nested.join("d.md"), "second note").unwrap();
        fs::write(tmp.path().join("skip.rs"), "fn main() {}").unwrap();

        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        let mut paths = BTreeMap::new();
        let documents = collect_documents(tmp.path(), &engine, &mut paths).unwrap();

        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first note", "second note", "third note"]);
        let ids: Vec<u64> = documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(paths[&2].ends_with("d.md"));
    }

    #[test]
    fn test_collect_documents_rejects_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        let mut paths = BTreeMap::new();
        assert!(collect_documents(&tmp.path().join("absent"), &engine, &mut paths).is_err());
    }
}
