//! Source language detection from file extensions

use tree_sitter::Language;

/// Languages the structural parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Python,
}

impl SourceLanguage {
    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "Python",
        }
    }

    /// Fence tag used when quoting source in prompts
    pub fn fence_tag(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "python",
        }
    }

    pub(crate) fn grammar(&self) -> Language {
        match self {
            SourceLanguage::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// Detect source language from file extension
pub fn detect_language(extension: &str) -> Option<SourceLanguage> {
    match extension.to_lowercase().as_str() {
        "py" | "pyw" => Some(SourceLanguage::Python),
        _ => None,
    }
}

/// Detect source language from a path's extension
pub fn detect_language_for_path(path: &str) -> Option<SourceLanguage> {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(detect_language)
}
