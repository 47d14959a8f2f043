//! Lexis: multilingual full-text and trigram fuzzy search
//!
//! Documents are normalized into per-profile token vectors, indexed in an
//! inverted index keyed by lexeme and a trigram index keyed by character
//! 3-grams, and queried through [`SearchEngine`].
//!
//! ```
//! use lexis::{Document, EngineConfig, Profile, SearchEngine, SearchMode};
//!
//! let engine = SearchEngine::new(EngineConfig::default()).unwrap();
//! engine.index_document(Document::new(1, "The runners were running")).unwrap();
//!
//! let hits = engine
//!     .search("run", Profile::EnglishUnaccent, SearchMode::Exact, 10)
//!     .unwrap();
//! assert_eq!(hits[0].doc_id, 1);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod query;
pub mod tokenizer;

pub use config::{EngineConfig, FuzzyConfig, HighlightOptions, TokenizerConfig};
pub use engine::{EngineSnapshot, EngineStats, SearchEngine};
pub use error::{LexisError, Result};
pub use models::*;
pub use tokenizer::{Profile, ProfileSelector, Tokenizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
