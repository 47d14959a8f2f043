use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use stop_words::LANGUAGE;

use super::normalizer::fold_accents;
use crate::error::{LexisError, Result};

/// Named language configuration used to normalize text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// English stemming with accent folding
    EnglishUnaccent,
    /// Russian stemming with accent folding
    RussianUnaccent,
    /// Lowercasing only
    Simple,
}

impl Profile {
    pub const ALL: [Profile; 3] = [
        Profile::EnglishUnaccent,
        Profile::RussianUnaccent,
        Profile::Simple,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::EnglishUnaccent => "english_unaccent",
            Profile::RussianUnaccent => "russian_unaccent",
            Profile::Simple => "simple",
        }
    }

    fn algorithm(&self) -> Option<Algorithm> {
        match self {
            Profile::EnglishUnaccent => Some(Algorithm::English),
            Profile::RussianUnaccent => Some(Algorithm::Russian),
            Profile::Simple => None,
        }
    }

    fn stopword_language(&self) -> Option<LANGUAGE> {
        match self {
            Profile::EnglishUnaccent => Some(LANGUAGE::English),
            Profile::RussianUnaccent => Some(LANGUAGE::Russian),
            Profile::Simple => None,
        }
    }

    pub fn folds_accents(&self) -> bool {
        !matches!(self, Profile::Simple)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = LexisError;

    /// Accepts canonical names and the short language names used by the query front-end.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "english_unaccent" | "english" | "en" => Ok(Profile::EnglishUnaccent),
            "russian_unaccent" | "russian" | "ru" => Ok(Profile::RussianUnaccent),
            "simple" => Ok(Profile::Simple),
            other => Err(LexisError::InvalidProfile(other.to_string())),
        }
    }
}

/// Which profiles a query runs against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileSelector {
    One(Profile),
    All,
}

impl ProfileSelector {
    /// Resolve to the concrete profiles, rejecting ones that are not enabled.
    pub fn resolve(&self, enabled: &[Profile]) -> Result<Vec<Profile>> {
        match self {
            ProfileSelector::One(profile) => {
                if enabled.contains(profile) {
                    Ok(vec![*profile])
                } else {
                    Err(LexisError::InvalidProfile(format!(
                        "{} is not enabled",
                        profile
                    )))
                }
            }
            ProfileSelector::All => Ok(enabled.to_vec()),
        }
    }
}

impl From<Profile> for ProfileSelector {
    fn from(profile: Profile) -> Self {
        ProfileSelector::One(profile)
    }
}

impl FromStr for ProfileSelector {
    type Err = LexisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" | "both" => Ok(ProfileSelector::All),
            other => other.parse().map(ProfileSelector::One),
        }
    }
}

/// Immutable normalization pipeline for one profile
pub struct LanguageProfile {
    profile: Profile,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl LanguageProfile {
    pub fn new(profile: Profile) -> Self {
        let stemmer = profile.algorithm().map(Stemmer::create);

        // Stop words are matched after folding, so fold the list too
        let stopwords = match profile.stopword_language() {
            Some(language) => stop_words::get(language)
                .iter()
                .map(|w| fold_accents(w).to_lowercase())
                .collect(),
            None => HashSet::new(),
        };

        Self {
            profile,
            stemmer,
            stopwords,
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Normalize one raw word. Returns `None` for stop words.
    pub fn normalize(&self, word: &str) -> Option<String> {
        let folded = if self.profile.folds_accents() {
            fold_accents(word)
        } else {
            word.to_string()
        };
        let lowered = folded.to_lowercase();

        if self.stopwords.contains(&lowered) {
            return None;
        }

        match &self.stemmer {
            Some(stemmer) => Some(stemmer.stem(&lowered).into_owned()),
            None => Some(lowered),
        }
    }

}

impl fmt::Debug for LanguageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageProfile")
            .field("profile", &self.profile)
            .field("stemming", &self.stemmer.is_some())
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}
