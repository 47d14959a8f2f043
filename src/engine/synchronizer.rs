use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Document, DocumentVectors};
use crate::tokenizer::{Profile, Tokenizer};

/// Derives every profile's token vector from document content.
///
/// Derivation is all-or-nothing: if any profile fails, no vectors are
/// returned and the write that asked for them must be rejected.
pub struct VectorSynchronizer {
    tokenizer: Arc<Tokenizer>,
    profiles: Vec<Profile>,
}

impl VectorSynchronizer {
    pub fn new(tokenizer: Arc<Tokenizer>, profiles: &[Profile]) -> Self {
        Self {
            tokenizer,
            profiles: profiles.to_vec(),
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Compute all token vectors for the given content
    pub fn sync(&self, content: &str) -> Result<DocumentVectors> {
        let mut vectors = BTreeMap::new();
        for profile in &self.profiles {
            match self.tokenizer.tokenize(content, *profile) {
                Ok(vector) => {
                    vectors.insert(*profile, vector);
                }
                Err(e) => {
                    warn!(profile = %profile, error = %e, "token vector derivation failed");
                    return Err(e);
                }
            }
        }
        debug!(profiles = vectors.len(), "derived token vectors");
        Ok(DocumentVectors::new(vectors))
    }

    pub fn sync_document(&self, document: &Document) -> Result<DocumentVectors> {
        self.sync(&document.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::error::LexisError;

    fn synchronizer(config: TokenizerConfig) -> VectorSynchronizer {
        let tokenizer = Arc::new(Tokenizer::new(&config, &Profile::ALL));
        VectorSynchronizer::new(tokenizer, &Profile::ALL)
    }

    #[test]
    fn test_sync_produces_every_profile() {
        let sync = synchronizer(TokenizerConfig::default());
        let vectors = sync.sync("The runners are running").unwrap();
        assert_eq!(vectors.len(), 3);

        let english = vectors.get(Profile::EnglishUnaccent).unwrap();
        assert!(english.lexemes().contains("run"));
        let simple = vectors.get(Profile::Simple).unwrap();
        assert!(simple.lexemes().contains("running"));
    }

    #[test]
    fn test_sync_is_all_or_nothing() {
        let sync = synchronizer(TokenizerConfig::default());
        let err = sync.sync("broken\0content").unwrap_err();
        assert!(matches!(err, LexisError::Normalization { .. }));
    }

    #[test]
    fn test_empty_content_gives_empty_vectors() {
        let sync = synchronizer(TokenizerConfig::default());
        let vectors = sync.sync_document(&Document::new(1, "")).unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|(_, v)| v.is_empty()));
    }
}
