use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::tokenizer::Profile;

/// Unique document identifier
pub type DocumentId = u64;

/// Plain-text document supplied by the ingestion collaborator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    pub modified_at: u64,
}

impl Document {
    pub fn new(id: DocumentId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            modified_at: current_timestamp(),
        }
    }

    pub fn with_modified_at(mut self, modified_at: u64) -> Self {
        self.modified_at = modified_at;
        self
    }
}

/// A normalized lexeme and the 1-based position of the word it came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub lexeme: String,
    pub position: u32,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, position: u32) -> Self {
        Self {
            lexeme: lexeme.into(),
            position,
        }
    }
}

/// Ordered (lexeme, position) sequence for one document under one profile
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVector {
    tokens: Vec<Token>,
}

impl TokenVector {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Distinct lexemes of this vector
    pub fn lexemes(&self) -> BTreeSet<&str> {
        self.tokens.iter().map(|t| t.lexeme.as_str()).collect()
    }

    /// Lexeme -> sorted, deduplicated positions
    pub fn positions_by_lexeme(&self) -> BTreeMap<&str, Vec<u32>> {
        let mut positions: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for token in &self.tokens {
            positions
                .entry(token.lexeme.as_str())
                .or_default()
                .push(token.position);
        }
        for list in positions.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        positions
    }

    /// Sorted, deduplicated positions of a single lexeme
    pub fn positions_of(&self, lexeme: &str) -> Vec<u32> {
        let mut positions: Vec<u32> = self
            .tokens
            .iter()
            .filter(|t| t.lexeme == lexeme)
            .map(|t| t.position)
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    /// Approximate stored size: lexeme bytes plus a fixed cost per entry
    pub fn encoded_size(&self) -> usize {
        self.tokens.iter().map(|t| t.lexeme.len() + 4).sum()
    }
}

/// The full set of token vectors derived from one version of a document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVectors {
    vectors: BTreeMap<Profile, TokenVector>,
}

impl DocumentVectors {
    pub fn new(vectors: BTreeMap<Profile, TokenVector>) -> Self {
        Self { vectors }
    }

    pub fn get(&self, profile: Profile) -> Option<&TokenVector> {
        self.vectors.get(&profile)
    }

    pub fn profiles(&self) -> impl Iterator<Item = Profile> + '_ {
        self.vectors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Profile, &TokenVector)> {
        self.vectors.iter().map(|(p, v)| (*p, v))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
