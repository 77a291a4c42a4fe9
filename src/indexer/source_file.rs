//! A source file discovered by the scanner

use super::language::{SourceLanguage, detect_language_for_path};
use std::path::PathBuf;

/// Information about a discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the scanned root, `/`-separated; used as the file identity
    pub relative_path: String,
    pub size: u64,
}

impl SourceFile {
    pub fn language(&self) -> Option<SourceLanguage> {
        detect_language_for_path(&self.relative_path)
    }
}
