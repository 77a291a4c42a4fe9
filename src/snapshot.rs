//! Persisted structural fingerprints of a project

use crate::error::CorruptStateError;
use crate::indexer::FileFingerprint;
use crate::state_file;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Map of relative file path -> fingerprint, replaced wholesale after each successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub files: BTreeMap<String, FileFingerprint>,
}

impl Snapshot {
    /// Load a snapshot; a missing file is an empty snapshot
    pub fn load(path: &Path) -> Result<Self, CorruptStateError> {
        Ok(state_file::read_state(path)?.unwrap_or_default())
    }

    /// Load a snapshot, treating corruption as empty prior state
    pub fn load_or_empty(path: &Path) -> Self {
        let snapshot: Self = state_file::read_state_or_default(path, "fingerprint snapshot");
        tracing::debug!("Loaded snapshot with {} files", snapshot.files.len());
        snapshot
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        state_file::write_state(path, self)?;
        tracing::debug!("Saved snapshot with {} files to {:?}", self.files.len(), path);
        Ok(())
    }

    pub fn get(&self, file_path: &str) -> Option<&FileFingerprint> {
        self.files.get(file_path)
    }

    pub fn insert(&mut self, file_path: String, fingerprint: FileFingerprint) {
        self.files.insert(file_path, fingerprint);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
