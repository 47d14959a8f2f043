use serde::{Deserialize, Serialize};

use crate::error::{LexisError, Result};
use crate::tokenizer::Profile;

/// Engine configuration, fixed for the lifetime of a [`crate::SearchEngine`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub profiles: Vec<Profile>,
    pub tokenizer: TokenizerConfig,
    pub fuzzy: FuzzyConfig,
    pub default_limit: usize,
    pub highlight: HighlightOptions,
    /// Worker threads used by batch indexing
    pub reindex_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profiles: Profile::ALL.to_vec(),
            tokenizer: TokenizerConfig::default(),
            fuzzy: FuzzyConfig::default(),
            default_limit: 10,
            highlight: HighlightOptions::default(),
            reindex_workers: num_cpus::get(),
        }
    }
}

impl EngineConfig {
    /// Restrict the engine to the given profiles
    pub fn with_profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Set the fuzzy similarity threshold
    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.fuzzy.threshold = threshold;
        self
    }

    /// Set the weight applied to fuzzy scores in combined mode
    pub fn with_combined_weight(mut self, weight: f32) -> Self {
        self.fuzzy.combined_weight = weight;
        self
    }

    /// Set the result limit used when a request does not carry one
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the number of batch indexing workers
    pub fn with_reindex_workers(mut self, workers: usize) -> Self {
        self.reindex_workers = workers;
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightOptions) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(LexisError::InvalidRequest(
                "at least one profile must be enabled".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fuzzy.threshold) {
            return Err(LexisError::InvalidRequest(format!(
                "fuzzy threshold {} outside [0, 1]",
                self.fuzzy.threshold
            )));
        }
        if self.fuzzy.combined_weight < 0.0 {
            return Err(LexisError::InvalidRequest(
                "combined weight must not be negative".to_string(),
            ));
        }
        self.highlight.validate()
    }
}

/// Tokenizer limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Longest word, in bytes, that produces a lexeme
    pub max_token_length: usize,
    /// Largest accepted token vector, in encoded bytes
    pub max_vector_bytes: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_token_length: 2047,
            max_vector_bytes: 1024 * 1024,
        }
    }
}

/// Trigram matching settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// A document matches when its similarity is strictly above this
    pub threshold: f32,
    /// Multiplier for fuzzy scores in combined mode
    pub combined_weight: f32,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            combined_weight: 1.0,
        }
    }
}

/// Snippet generation options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightOptions {
    pub start_sel: String,
    pub stop_sel: String,
    pub max_words: usize,
    pub min_words: usize,
    /// 0 or 1 produce a single excerpt
    pub max_fragments: usize,
    pub fragment_delimiter: String,
    /// Mark matches across the whole content instead of excerpting
    pub highlight_all: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            start_sel: "***".to_string(),
            stop_sel: "***".to_string(),
            max_words: 35,
            min_words: 15,
            max_fragments: 1,
            fragment_delimiter: " ... ".to_string(),
            highlight_all: false,
        }
    }
}

impl HighlightOptions {
    pub fn with_delimiters(mut self, start: impl Into<String>, stop: impl Into<String>) -> Self {
        self.start_sel = start.into();
        self.stop_sel = stop.into();
        self
    }

    pub fn with_words(mut self, min_words: usize, max_words: usize) -> Self {
        self.min_words = min_words;
        self.max_words = max_words;
        self
    }

    pub fn with_max_fragments(mut self, max_fragments: usize) -> Self {
        self.max_fragments = max_fragments;
        self
    }

    pub fn with_highlight_all(mut self, highlight_all: bool) -> Self {
        self.highlight_all = highlight_all;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(LexisError::InvalidRequest(
                "max_words must be positive".to_string(),
            ));
        }
        if self.min_words > self.max_words {
            return Err(LexisError::InvalidRequest(format!(
                "min_words {} exceeds max_words {}",
                self.min_words, self.max_words
            )));
        }
        Ok(())
    }
}
