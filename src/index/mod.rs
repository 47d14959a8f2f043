pub mod inverted;
pub mod postings;
pub mod trigram;

pub use inverted::InvertedIndex;
pub use postings::{Generation, Posting, PostingList};
pub use trigram::{extract_trigrams, TrigramIndex, TrigramSet};
