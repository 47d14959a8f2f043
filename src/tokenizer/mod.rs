pub mod normalizer;
pub mod profile;
#[allow(clippy::module_inception)]
pub mod tokenizer;

pub use normalizer::fold_accents;
pub use profile::{LanguageProfile, Profile, ProfileSelector};
pub use tokenizer::{Tokenizer, WordUnit};
