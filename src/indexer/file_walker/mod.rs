//! File walking functionality for directory traversal

use super::source_file::SourceFile;
use crate::config::ScannerConfig;
use crate::error::NotFoundError;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    pub(crate) extensions: Vec<String>,
    pub(crate) exclude_dirs: Vec<String>,
    pub(crate) respect_gitignore: bool,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            extensions: vec!["py".to_string()],
            exclude_dirs: vec!["__pycache__".to_string(), "venv".to_string()],
            respect_gitignore: false,
        }
    }

    pub fn from_config(root: impl AsRef<Path>, config: &ScannerConfig) -> Self {
        Self::new(root, config.max_file_size)
            .with_extensions(config.extensions.clone())
            .with_exclude_dirs(config.exclude_dirs.clone())
            .with_gitignore(config.respect_gitignore)
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_exclude_dirs(mut self, exclude_dirs: Vec<String>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    pub fn with_gitignore(mut self, respect_gitignore: bool) -> Self {
        self.respect_gitignore = respect_gitignore;
        self
    }

    /// Walk the directory and collect all eligible source files
    ///
    /// Directories named in `exclude_dirs` and any directory starting with `.` are
    /// never descended into. Entries are visited sorted by file name at each level.
    pub fn walk(&self) -> Result<Vec<SourceFile>, NotFoundError> {
        if !self.root.exists() {
            return Err(NotFoundError::Directory(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(NotFoundError::NotADirectory(
                self.root.display().to_string(),
            ));
        }

        let exclude_dirs = self.exclude_dirs.clone();
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(self.respect_gitignore)
            .hidden(false) // dot-directories are handled by the entry filter
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !(name.starts_with('.') || exclude_dirs.iter().any(|d| d.as_str() == name))
            })
            .build();

        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if !path.is_file() || !self.has_source_extension(path) {
                continue;
            }

            let size = match fs::metadata(path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            if size > self.max_file_size as u64 {
                tracing::debug!("Skipping large file: {:?}", path);
                continue;
            }

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path: self.relative_path(path),
                size,
            });
        }

        tracing::info!("Found {} source files under {:?}", files.len(), self.root);
        Ok(files)
    }

    pub(crate) fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }

    /// Root-relative path joined with `/` on every platform
    pub(crate) fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests;
