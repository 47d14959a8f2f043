use serde::{Deserialize, Serialize};

use super::document::DocumentId;
use crate::tokenizer::{Profile, ProfileSelector};

/// Ranked search hit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub doc_id: DocumentId,
    pub score: f32,
    /// Positions of matched words, ascending
    pub positions: Vec<u32>,
    /// Profile that produced the exact-match score, if any
    pub profile: Option<Profile>,
}

impl ScoredResult {
    pub fn new(doc_id: DocumentId, score: f32) -> Self {
        Self {
            doc_id,
            score,
            positions: Vec::new(),
            profile: None,
        }
    }

    pub fn with_positions(mut self, positions: Vec<u32>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Stemmed lexeme match ranked by cover density
    Exact,
    /// Trigram similarity over raw content
    Fuzzy,
    /// Both, with fuzzy scores added to exact scores
    Combined,
}

impl std::str::FromStr for SearchMode {
    type Err = crate::LexisError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(SearchMode::Exact),
            "fuzzy" => Ok(SearchMode::Fuzzy),
            "combined" => Ok(SearchMode::Combined),
            other => Err(crate::LexisError::InvalidRequest(format!(
                "unknown search mode: {}",
                other
            ))),
        }
    }
}

/// Search request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub profiles: ProfileSelector,
    pub mode: SearchMode,
    /// Falls back to the engine's `default_limit` when unset
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_profiles(mut self, profiles: impl Into<ProfileSelector>) -> Self {
        self.profiles = profiles.into();
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            profiles: ProfileSelector::One(Profile::EnglishUnaccent),
            mode: SearchMode::Exact,
            limit: None,
        }
    }
}
