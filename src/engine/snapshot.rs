use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{LexisError, Result};
use crate::models::Document;

/// Snapshot version for compatibility checking
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted engine state.
///
/// Only documents and configuration are stored; token vectors and indexes
/// are derived data and are rebuilt through the normal write path on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub config: EngineConfig,
    /// Live documents ordered by id
    pub documents: Vec<Document>,
}

impl EngineSnapshot {
    /// Create a new snapshot with the current version
    pub fn new(config: EngineConfig, documents: Vec<Document>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config,
            documents,
        }
    }

    /// Serialize snapshot to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize snapshot from bytes, rejecting newer versions
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(data)?;
        if !snapshot.is_compatible() {
            return Err(LexisError::IncompatibleSnapshot {
                expected: SNAPSHOT_VERSION,
                actual: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Check if this snapshot version is compatible
    pub fn is_compatible(&self) -> bool {
        self.version <= SNAPSHOT_VERSION
    }

    /// Write to `path` through a temporary file so a crash never leaves a
    /// truncated snapshot behind.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.snap");

        let snapshot = EngineSnapshot::new(
            EngineConfig::default(),
            vec![Document::new(1, "hello world").with_modified_at(10)],
        );
        snapshot.write_to(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = EngineSnapshot::read_from(&path).unwrap();
        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        assert_eq!(loaded.documents, snapshot.documents);
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut snapshot = EngineSnapshot::new(EngineConfig::default(), Vec::new());
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = snapshot.to_bytes().unwrap();
        let err = EngineSnapshot::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, LexisError::IncompatibleSnapshot { .. }));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(EngineSnapshot::from_bytes(&[1, 2, 3]).is_err());
    }
}
