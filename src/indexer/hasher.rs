//! Content hashing of structural units

use super::units::ParsedFile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// SHA-256 hex digest of a unit's source text
pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hashes of one class: its own source plus each direct method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFingerprint {
    pub source_hash: String,
    #[serde(default)]
    pub methods: BTreeMap<String, String>,
}

/// Nested per-file fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    #[serde(default)]
    pub functions: BTreeMap<String, String>,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassFingerprint>,
}

impl FileFingerprint {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty()
    }
}

/// Build the fingerprint of a parsed file
pub fn fingerprint(parsed: &ParsedFile) -> FileFingerprint {
    let functions = parsed
        .functions
        .iter()
        .map(|f| (f.name.clone(), hash_source(&f.source)))
        .collect();

    let classes = parsed
        .classes
        .iter()
        .map(|c| {
            let methods = c
                .methods
                .iter()
                .map(|m| (m.name.clone(), hash_source(&m.source)))
                .collect();
            (
                c.name.clone(),
                ClassFingerprint {
                    source_hash: hash_source(&c.own_source),
                    methods,
                },
            )
        })
        .collect();

    FileFingerprint { functions, classes }
}
