//! Persisted per-project summary database

use crate::error::CorruptStateError;
use crate::state_file;
use crate::types::{DocumentMetadata, IndexedDocument, UnitId, UnitKind};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A generated summary and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub file_path: String,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub name: String,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn unit_id(&self) -> UnitId {
        UnitId::new(&self.file_path, self.class_name.as_deref(), &self.name)
    }

    pub fn id(&self) -> String {
        self.unit_id().to_string()
    }

    /// Projection of this record into the search index
    pub fn to_document(&self) -> IndexedDocument {
        IndexedDocument {
            id: self.id(),
            text: self.summary.clone(),
            metadata: DocumentMetadata {
                source: self.file_path.clone(),
                unit_type: self.kind,
                name: self.name.clone(),
                class: match self.kind {
                    UnitKind::Method => self.class_name.clone(),
                    _ => None,
                },
            },
        }
    }
}

/// Summaries keyed by qualified identity, one map per unit kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStore {
    #[serde(default)]
    pub functions: BTreeMap<String, SummaryRecord>,
    #[serde(default)]
    pub classes: BTreeMap<String, SummaryRecord>,
    #[serde(default)]
    pub methods: BTreeMap<String, SummaryRecord>,
}

impl SummaryStore {
    /// Load the store; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self, CorruptStateError> {
        Ok(state_file::read_state(path)?.unwrap_or_default())
    }

    /// Load the store, treating corruption as an empty store
    pub fn load_or_empty(path: &Path) -> Self {
        state_file::read_state_or_default(path, "summary store")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        state_file::write_state(path, self)?;
        tracing::debug!("Saved {} summaries to {:?}", self.len(), path);
        Ok(())
    }

    fn bucket(&self, kind: UnitKind) -> &BTreeMap<String, SummaryRecord> {
        match kind {
            UnitKind::Function => &self.functions,
            UnitKind::Class => &self.classes,
            UnitKind::Method => &self.methods,
        }
    }

    fn bucket_mut(&mut self, kind: UnitKind) -> &mut BTreeMap<String, SummaryRecord> {
        match kind {
            UnitKind::Function => &mut self.functions,
            UnitKind::Class => &mut self.classes,
            UnitKind::Method => &mut self.methods,
        }
    }

    pub fn get(&self, kind: UnitKind, id: &str) -> Option<&SummaryRecord> {
        self.bucket(kind).get(id)
    }

    /// Insert or overwrite; returns the record's id
    pub fn upsert(&mut self, record: SummaryRecord) -> String {
        let id = record.id();
        self.bucket_mut(record.kind).insert(id.clone(), record);
        id
    }

    /// Remove an entry if present
    pub fn remove(&mut self, kind: UnitKind, id: &str) -> Option<SummaryRecord> {
        self.bucket_mut(kind).remove(id)
    }

    /// Ids of stored methods belonging to a class
    pub fn method_ids_of_class(&self, file_path: &str, class_name: &str) -> Vec<String> {
        let prefix = UnitId::class_member_prefix(file_path, class_name);
        self.methods
            .range(prefix.clone()..)
            .take_while(|(id, _)| id.starts_with(&prefix))
            .filter(|(id, _)| !id[prefix.len()..].contains(crate::types::ID_DELIMITER))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.classes.len() + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, functions then classes then methods, each sorted by id
    pub fn records(&self) -> impl Iterator<Item = &SummaryRecord> {
        self.functions
            .values()
            .chain(self.classes.values())
            .chain(self.methods.values())
    }

    pub fn documents(&self) -> Vec<IndexedDocument> {
        self.records().map(SummaryRecord::to_document).collect()
    }
}
