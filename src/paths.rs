/// Platform-specific path computation
///
/// Follows the XDG Base Directory specification on Unix-like systems.
use std::path::{Path, PathBuf};

const APP_DIR: &str = "code-insight";

/// Home directory, falling back to the working directory
fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("LOCALAPPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            home_dir().join("Library/Application Support")
        } else {
            std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home_dir().join(".local/share"))
        }
    }

    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            home_dir().join("Library/Application Support")
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home_dir().join(".config"))
        }
    }

    /// Returns: {data_dir}/code-insight
    pub fn app_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/code-insight/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join(APP_DIR).join("config.toml")
    }

    /// Returns: {data_dir}/code-insight/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::app_data_dir().join("lancedb")
    }

    /// Directory holding one project's snapshot and summary store
    pub fn project_state_dir(data_dir: &Path, project: &str) -> PathBuf {
        data_dir.join("projects").join(project)
    }

    /// Snapshot of structural fingerprints for a project
    pub fn snapshot_path(data_dir: &Path, project: &str) -> PathBuf {
        Self::project_state_dir(data_dir, project).join("code_hashes.json")
    }

    /// Persisted summary database for a project
    pub fn summary_store_path(data_dir: &Path, project: &str) -> PathBuf {
        Self::project_state_dir(data_dir, project).join("summaries_db.json")
    }

    /// Directory holding cross-process run locks
    pub fn lock_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("locks")
    }
}
