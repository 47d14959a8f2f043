use thiserror::Error;

use crate::models::DocumentId;

/// Main error type for Lexis operations
#[derive(Error, Debug)]
pub enum LexisError {
    #[error("Normalization failed for profile {profile}: {reason}")]
    Normalization { profile: String, reason: String },

    #[error("Invalid language profile: {0}")]
    InvalidProfile(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Incompatible snapshot version: expected <= {expected}, found {actual}")]
    IncompatibleSnapshot { expected: u32, actual: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Lexis operations
pub type Result<T> = std::result::Result<T, LexisError>;

impl LexisError {
    pub(crate) fn normalization(profile: impl ToString, reason: impl Into<String>) -> Self {
        LexisError::Normalization {
            profile: profile.to_string(),
            reason: reason.into(),
        }
    }

    /// True when a structural index invariant was found broken
    pub fn is_corruption(&self) -> bool {
        matches!(self, LexisError::IndexCorruption(_))
    }

    /// Check if this error was caused by the caller's input rather than engine state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LexisError::InvalidProfile(_)
                | LexisError::InvalidRequest(_)
                | LexisError::DocumentNotFound(_)
                | LexisError::Normalization { .. }
        )
    }
}
