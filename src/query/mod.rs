//! Query evaluation
//!
//! Exact queries are normalized through the same tokenizer as documents,
//! intersected over the inverted index and ranked by cover density. Fuzzy
//! queries skip normalization and rank raw-content trigram similarity.
//! Combined queries add the two scores.

pub mod executor;
pub mod highlight;
pub mod ranking;

pub use executor::QueryExecutor;
pub use highlight::Highlighter;
