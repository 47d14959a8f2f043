pub mod command;
pub mod document;
pub mod search;

pub use command::{BatchReport, Command, CommandOutcome, IndexOutcome, ReindexReport};
pub use document::{current_timestamp, Document, DocumentId, DocumentVectors, Token, TokenVector};
pub use search::{ScoredResult, SearchMode, SearchRequest};
