use std::collections::{BTreeSet, HashMap};

use dashmap::DashMap;
use tracing::trace;

use super::postings::{Generation, Posting, PostingList};
use crate::error::{LexisError, Result};
use crate::models::{DocumentId, TokenVector};
use crate::tokenizer::Profile;

/// Lexemes a document version contributed to one profile
#[derive(Clone, Debug)]
struct StagedVersion {
    generation: Generation,
    lexemes: Vec<String>,
}

/// Lexeme -> postings, partitioned by profile.
///
/// A forward map from `(doc_id, profile)` to the staged versions lets every
/// removal touch only the lists a document actually appears in.
pub struct InvertedIndex {
    shards: HashMap<Profile, DashMap<String, PostingList>>,
    forward: DashMap<(DocumentId, Profile), Vec<StagedVersion>>,
}

impl InvertedIndex {
    pub fn new(profiles: &[Profile]) -> Self {
        Self {
            shards: profiles.iter().map(|p| (*p, DashMap::new())).collect(),
            forward: DashMap::new(),
        }
    }

    fn shard(&self, profile: Profile) -> Result<&DashMap<String, PostingList>> {
        self.shards
            .get(&profile)
            .ok_or_else(|| LexisError::InvalidProfile(format!("{} is not indexed", profile)))
    }

    /// Stage the postings of one document version.
    ///
    /// Postings of other generations of the same document are left in place
    /// until [`retire`](Self::retire) drops them, so a writer can publish the
    /// new version before the old one disappears. Re-staging the same
    /// generation replaces it.
    pub fn insert(
        &self,
        doc_id: DocumentId,
        generation: Generation,
        profile: Profile,
        vector: &TokenVector,
    ) -> Result<()> {
        let shard = self.shard(profile)?;
        let positions = vector.positions_by_lexeme();

        // A restaged generation may have lost lexemes
        self.drop_versions(shard, doc_id, profile, |g| g == generation);

        let mut lexemes = Vec::with_capacity(positions.len());
        for (lexeme, positions) in positions {
            shard
                .entry(lexeme.to_string())
                .or_default()
                .add_posting(Posting::new(doc_id, generation, positions));
            lexemes.push(lexeme.to_string());
        }

        trace!(doc_id, generation, %profile, lexemes = lexemes.len(), "staged postings");
        self.forward
            .entry((doc_id, profile))
            .or_default()
            .push(StagedVersion {
                generation,
                lexemes,
            });
        Ok(())
    }

    /// Drop every generation of a document except `keep`
    pub fn retire(&self, doc_id: DocumentId, profile: Profile, keep: Generation) -> Result<usize> {
        let shard = self.shard(profile)?;
        Ok(self.drop_versions(shard, doc_id, profile, |g| g != keep))
    }

    /// Drop one generation, used to roll back a failed write
    pub fn discard(
        &self,
        doc_id: DocumentId,
        profile: Profile,
        generation: Generation,
    ) -> Result<usize> {
        let shard = self.shard(profile)?;
        Ok(self.drop_versions(shard, doc_id, profile, |g| g == generation))
    }

    /// Remove all postings of a document under a profile
    pub fn remove(&self, doc_id: DocumentId, profile: Profile) -> Result<usize> {
        let shard = self.shard(profile)?;
        Ok(self.drop_versions(shard, doc_id, profile, |_| true))
    }

    fn drop_versions(
        &self,
        shard: &DashMap<String, PostingList>,
        doc_id: DocumentId,
        profile: Profile,
        predicate: impl Fn(Generation) -> bool,
    ) -> usize {
        let dropped: Vec<StagedVersion> = {
            let Some(mut versions) = self.forward.get_mut(&(doc_id, profile)) else {
                return 0;
            };
            let (dropped, kept): (Vec<StagedVersion>, Vec<StagedVersion>) =
                versions.drain(..).partition(|v| predicate(v.generation));
            *versions = kept;
            dropped
        };
        self.forward
            .remove_if(&(doc_id, profile), |_, versions| versions.is_empty());

        let mut removed = 0;
        for version in &dropped {
            for lexeme in &version.lexemes {
                let emptied = match shard.get_mut(lexeme) {
                    Some(mut list) => {
                        removed +=
                            list.remove_document_where(doc_id, |g| g == version.generation);
                        list.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    shard.remove_if(lexeme, |_, list| list.is_empty());
                }
            }
        }
        removed
    }

    /// Postings for a lexeme ordered by document id; empty when absent
    pub fn lookup(&self, lexeme: &str, profile: Profile) -> Result<PostingList> {
        Ok(self
            .shard(profile)?
            .get(lexeme)
            .map(|list| list.clone())
            .unwrap_or_default())
    }

    /// Whether any version of a document holds a posting for the lexeme
    pub fn contains(&self, lexeme: &str, profile: Profile, doc_id: DocumentId) -> bool {
        self.shards
            .get(&profile)
            .and_then(|shard| shard.get(lexeme).map(|list| list.contains_document(doc_id)))
            .unwrap_or(false)
    }

    /// Whether a specific document version holds a posting for the lexeme
    pub fn contains_version(
        &self,
        lexeme: &str,
        profile: Profile,
        doc_id: DocumentId,
        generation: Generation,
    ) -> bool {
        self.shards
            .get(&profile)
            .and_then(|shard| {
                shard
                    .get(lexeme)
                    .map(|list| list.get(doc_id, generation).is_some())
            })
            .unwrap_or(false)
    }

    /// Generations staged for a document under a profile, ascending
    pub fn generations(&self, doc_id: DocumentId, profile: Profile) -> Vec<Generation> {
        let mut generations: Vec<Generation> = self
            .forward
            .get(&(doc_id, profile))
            .map(|versions| versions.iter().map(|v| v.generation).collect())
            .unwrap_or_default();
        generations.sort_unstable();
        generations
    }

    /// Every document referenced by a posting in any profile.
    ///
    /// Walks the posting lists themselves rather than the forward map, so
    /// it also finds postings the forward map lost track of.
    pub fn referenced_documents(&self) -> BTreeSet<DocumentId> {
        let mut ids = BTreeSet::new();
        for shard in self.shards.values() {
            for entry in shard.iter() {
                ids.extend(entry.value().iter().map(|p| p.doc_id));
            }
        }
        ids
    }

    /// Distinct lexemes under a profile
    pub fn lexeme_count(&self, profile: Profile) -> usize {
        self.shards.get(&profile).map(|s| s.len()).unwrap_or(0)
    }

    pub fn profiles(&self) -> impl Iterator<Item = Profile> + '_ {
        self.shards.keys().copied()
    }
}
