//! Source scanning, structural parsing and hashing
//!
//! Walks a project directory, parses each source file into functions, classes and
//! methods, and fingerprints every unit by content hash.

mod ast_parser;
mod file_walker;
mod hasher;
mod language;
mod source_file;
mod units;

pub use ast_parser::AstParser;
pub use file_walker::FileWalker;
pub use hasher::{ClassFingerprint, FileFingerprint, fingerprint, hash_source};
pub use language::{SourceLanguage, detect_language, detect_language_for_path};
pub use source_file::SourceFile;
pub use units::{ClassUnit, FunctionUnit, ParsedFile};

use crate::error::ParseError;
use rayon::prelude::*;

/// Outcome of parsing one file
#[derive(Debug)]
pub struct FileParse {
    pub file: SourceFile,
    pub result: Result<ParsedFile, ParseError>,
}

/// Parse files in parallel, preserving input order
///
/// Each rayon worker keeps its own parser per language since tree-sitter parsers
/// are not shareable.
pub fn parse_files(files: Vec<SourceFile>) -> Vec<FileParse> {
    files
        .into_par_iter()
        .map_init(
            || None::<AstParser>,
            |parser, file| {
                let result = parse_one(parser, &file);
                FileParse { file, result }
            },
        )
        .collect()
}

fn parse_one(cached: &mut Option<AstParser>, file: &SourceFile) -> Result<ParsedFile, ParseError> {
    let language = file
        .language()
        .ok_or_else(|| ParseError::UnsupportedLanguage(file.relative_path.clone()))?;

    let parser = match cached.take() {
        Some(parser) if parser.language() == language => cached.insert(parser),
        _ => cached.insert(AstParser::new(language)?),
    };

    parser.parse_file(&file.path, &file.relative_path)
}
