use crate::pages::PageHash;

/// One write staged for a batched submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    /// Set the given fields of a hash record
    Hash { key: String, fields: PageHash },

    /// Add members to a set record
    SetMembers { key: String, members: Vec<String> },
}

impl StagedWrite {
    pub fn key(&self) -> &str {
        match self {
            Self::Hash { key, .. } | Self::SetMembers { key, .. } => key,
        }
    }
}

/// Writes collected for a single pipelined submission
///
/// The builder only collects operations; nothing reaches the store until the
/// batch is handed to [`PageStore::submit`](crate::storage::PageStore::submit).
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<StagedWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_hash(&mut self, key: impl Into<String>, fields: PageHash) {
        self.writes.push(StagedWrite::Hash {
            key: key.into(),
            fields,
        });
    }

    /// Stages a set write; empty member lists are skipped since stores
    /// cannot represent an empty set
    pub fn stage_set(&mut self, key: impl Into<String>, members: &[String]) {
        if members.is_empty() {
            return;
        }
        self.writes.push(StagedWrite::SetMembers {
            key: key.into(),
            members: members.to_vec(),
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[StagedWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<StagedWrite> {
        self.writes
    }
}
