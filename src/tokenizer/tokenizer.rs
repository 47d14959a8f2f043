use std::collections::HashMap;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::profile::{LanguageProfile, Profile};
use crate::config::TokenizerConfig;
use crate::error::{LexisError, Result};
use crate::models::{Token, TokenVector};

/// One word unit of the input stream with its byte span.
///
/// Hyphenated compounds form a single unit whose `parts` hold the pieces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordUnit<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// 1-based ordinal in the stream
    pub position: u32,
    pub parts: Vec<&'a str>,
}

#[derive(Clone, Copy)]
enum Piece<'a> {
    Word(usize, &'a str),
    Hyphen(usize),
    Gap,
}

/// Multilingual tokenizer holding one pipeline per enabled profile
pub struct Tokenizer {
    config: TokenizerConfig,
    profiles: HashMap<Profile, LanguageProfile>,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig, profiles: &[Profile]) -> Self {
        let profiles = profiles
            .iter()
            .map(|p| (*p, LanguageProfile::new(*p)))
            .collect();

        Self {
            config: config.clone(),
            profiles,
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn has_profile(&self, profile: Profile) -> bool {
        self.profiles.contains_key(&profile)
    }

    fn language(&self, profile: Profile) -> Result<&LanguageProfile> {
        self.profiles
            .get(&profile)
            .ok_or_else(|| LexisError::InvalidProfile(format!("{} is not enabled", profile)))
    }

    /// Validate raw content bytes as text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<&'a str> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            LexisError::normalization("any", format!("invalid UTF-8 at byte {}", e.valid_up_to()))
        })?;
        Ok(text)
    }

    /// Split text into word units, merging hyphenated compounds.
    pub fn segment<'a>(&self, text: &'a str) -> Vec<WordUnit<'a>> {
        let pieces: Vec<Piece<'a>> = text
            .split_word_bound_indices()
            .map(|(i, s)| {
                if s.chars().any(char::is_alphanumeric) {
                    Piece::Word(i, s)
                } else if s == "-" || s == "\u{2010}" {
                    Piece::Hyphen(i)
                } else {
                    Piece::Gap
                }
            })
            .collect();

        let mut units = Vec::new();
        let mut position = 0u32;
        let mut i = 0;

        while i < pieces.len() {
            let Piece::Word(start, first) = pieces[i] else {
                i += 1;
                continue;
            };
            let mut end = start + first.len();
            let mut parts = vec![first];
            i += 1;

            // word, hyphen, word with no whitespace in between
            while i + 1 < pieces.len() {
                match (pieces[i], pieces[i + 1]) {
                    (Piece::Hyphen(h), Piece::Word(w, word)) if h == end && w > h => {
                        parts.push(word);
                        end = w + word.len();
                        i += 2;
                    }
                    _ => break,
                }
            }

            position += 1;
            units.push(WordUnit {
                text: &text[start..end],
                start,
                end,
                position,
                parts: if parts.len() > 1 { parts } else { Vec::new() },
            });
        }

        units
    }

    /// Tokenize text into an ordered vector of (lexeme, position) pairs.
    ///
    /// Stop words and overlong words are dropped but still advance the
    /// position. Compound parts share the compound's position.
    ///
    /// # Example
    ///
    /// ```
    /// use lexis::config::TokenizerConfig;
    /// use lexis::tokenizer::{Profile, Tokenizer};
    ///
    /// let tokenizer = Tokenizer::new(&TokenizerConfig::default(), &Profile::ALL);
    /// let vector = tokenizer.tokenize("running quickly", Profile::EnglishUnaccent).unwrap();
    /// let lexemes: Vec<&str> = vector.iter().map(|t| t.lexeme.as_str()).collect();
    /// assert_eq!(lexemes, vec!["run", "quick"]);
    /// ```
    pub fn tokenize(&self, text: &str, profile: Profile) -> Result<TokenVector> {
        let language = self.language(profile)?;
        if text.is_empty() {
            return Ok(TokenVector::default());
        }
        if text.contains('\0') {
            return Err(LexisError::normalization(
                profile,
                "content contains a NUL character",
            ));
        }

        let mut tokens = Vec::new();
        for unit in self.segment(text) {
            let whole = self.normalize_word(language, unit.text);
            if let Some(lexeme) = &whole {
                tokens.push(Token::new(lexeme.clone(), unit.position));
            }
            for part in &unit.parts {
                if let Some(lexeme) = self.normalize_word(language, part) {
                    if whole.as_ref() != Some(&lexeme) {
                        tokens.push(Token::new(lexeme, unit.position));
                    }
                }
            }
        }

        let vector = TokenVector::new(tokens);
        let size = vector.encoded_size();
        if size > self.config.max_vector_bytes {
            return Err(LexisError::normalization(
                profile,
                format!(
                    "token vector is too long ({} bytes, max {})",
                    size, self.config.max_vector_bytes
                ),
            ));
        }
        Ok(vector)
    }

    /// Normalize a query into distinct lexemes in order of first appearance.
    pub fn query_lexemes(&self, query: &str, profile: Profile) -> Result<Vec<String>> {
        let vector = self.tokenize(query, profile)?;
        let mut lexemes: Vec<String> = Vec::new();
        for token in vector.iter() {
            if !lexemes.contains(&token.lexeme) {
                lexemes.push(token.lexeme.clone());
            }
        }
        Ok(lexemes)
    }

    fn normalize_word(&self, language: &LanguageProfile, word: &str) -> Option<String> {
        if word.len() > self.config.max_token_length {
            debug!(
                profile = %language.profile(),
                len = word.len(),
                "word is too long to be indexed, skipping"
            );
            return None;
        }
        language.normalize(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(&TokenizerConfig::default(), &Profile::ALL)
    }

    fn lexemes(vector: &TokenVector) -> Vec<(&str, u32)> {
        vector
            .iter()
            .map(|t| (t.lexeme.as_str(), t.position))
            .collect()
    }

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = tokenizer();
        let vector = tokenizer
            .tokenize("Hello World! This is a test.", Profile::Simple)
            .unwrap();

        assert_eq!(
            lexemes(&vector),
            vec![
                ("hello", 1),
                ("world", 2),
                ("this", 3),
                ("is", 4),
                ("a", 5),
                ("test", 6)
            ]
        );
    }

    #[test]
    fn test_stopwords_advance_position() {
        let tokenizer = tokenizer();
        let vector = tokenizer
            .tokenize("rust the programming", Profile::EnglishUnaccent)
            .unwrap();

        assert_eq!(lexemes(&vector), vec![("rust", 1), ("program", 3)]);
    }

    #[test]
    fn test_stemming() {
        let tokenizer = tokenizer();
        let vector = tokenizer
            .tokenize("running quickly", Profile::EnglishUnaccent)
            .unwrap();
        assert_eq!(lexemes(&vector), vec![("run", 1), ("quick", 2)]);
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = tokenizer();
        for profile in Profile::ALL {
            assert!(tokenizer.tokenize("", profile).unwrap().is_empty());
            assert!(tokenizer.tokenize("  ... !!", profile).unwrap().is_empty());
        }
    }

    #[test]
    fn test_hyphenated_compound() {
        let tokenizer = tokenizer();
        let units = tokenizer.segment("a well-known fact");
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].text, "well-known");
        assert_eq!(units[1].parts, vec!["well", "known"]);
        assert_eq!(units[2].position, 3);

        let vector = tokenizer.tokenize("a well-known fact", Profile::Simple).unwrap();
        assert_eq!(
            lexemes(&vector),
            vec![
                ("a", 1),
                ("well-known", 2),
                ("well", 2),
                ("known", 2),
                ("fact", 3)
            ]
        );
    }

    #[test]
    fn test_spaced_hyphen_is_not_compound() {
        let tokenizer = tokenizer();
        let units = tokenizer.segment("left - right");
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.parts.is_empty()));
    }

    #[test]
    fn test_segment_offsets() {
        let tokenizer = tokenizer();
        let text = "Привет, мир";
        let units = tokenizer.segment(text);
        assert_eq!(units.len(), 2);
        assert_eq!(&text[units[1].start..units[1].end], "мир");
    }

    #[test]
    fn test_accent_folding_per_profile() {
        let tokenizer = tokenizer();
        let folded = tokenizer.tokenize("café", Profile::EnglishUnaccent).unwrap();
        assert_eq!(lexemes(&folded), vec![("cafe", 1)]);

        let plain = tokenizer.tokenize("café", Profile::Simple).unwrap();
        assert_eq!(lexemes(&plain), vec![("café", 1)]);
    }

    #[test]
    fn test_overlong_word_skipped() {
        let config = TokenizerConfig {
            max_token_length: 5,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(&config, &[Profile::Simple]);
        let vector = tokenizer.tokenize("tiny enormous word", Profile::Simple).unwrap();
        assert_eq!(lexemes(&vector), vec![("tiny", 1), ("word", 3)]);
    }

    #[test]
    fn test_vector_size_limit() {
        let config = TokenizerConfig {
            max_vector_bytes: 16,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(&config, &[Profile::Simple]);
        let err = tokenizer
            .tokenize("one two three four five six", Profile::Simple)
            .unwrap_err();
        assert!(matches!(err, LexisError::Normalization { .. }));
    }

    #[test]
    fn test_rejects_nul_and_bad_bytes() {
        let tokenizer = tokenizer();
        assert!(tokenizer.tokenize("bad\0text", Profile::Simple).is_err());
        assert!(tokenizer.decode(&[0x66, 0xff, 0x6f]).is_err());
        assert_eq!(tokenizer.decode(b"fine").unwrap(), "fine");
    }

    #[test]
    fn test_unknown_profile() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default(), &[Profile::Simple]);
        let err = tokenizer
            .tokenize("text", Profile::RussianUnaccent)
            .unwrap_err();
        assert!(matches!(err, LexisError::InvalidProfile(_)));
    }

    #[test]
    fn test_query_lexemes_dedup() {
        let tokenizer = tokenizer();
        let lexemes = tokenizer
            .query_lexemes("runs running ran", Profile::EnglishUnaccent)
            .unwrap();
        assert_eq!(lexemes, vec!["run".to_string(), "ran".to_string()]);
    }
}
