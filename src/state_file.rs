//! JSON persistence for per-project state files

use crate::error::CorruptStateError;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a state file; `Ok(None)` when it does not exist yet
pub(crate) fn read_state<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CorruptStateError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| CorruptStateError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| CorruptStateError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Read a state file, treating a missing or corrupt file as empty state
pub(crate) fn read_state_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match read_state(path) {
        Ok(Some(value)) => value,
        Ok(None) => {
            tracing::debug!("No {} at {:?}, starting empty", what, path);
            T::default()
        }
        Err(e) => {
            tracing::warn!("Ignoring corrupt {}: {}", what, e);
            T::default()
        }
    }
}

/// Write a state file through a temporary sibling and a rename
pub(crate) fn write_state<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }

    let content = serde_json::to_string_pretty(value).context("Failed to serialize state")?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    fs::rename(&tmp_path, path).with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}

/// Delete a state file; returns whether it existed
pub(crate) fn remove_state(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", path)),
    }
}
