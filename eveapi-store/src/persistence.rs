//! File persistence helpers.
//!
//! JSON files (config, exported killmails) are written through a temp file
//! and a rename and are readable by their owner only.

use eveapi_core::MergedRecord;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;

const APP_DIR: &str = "eveapi";

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - Linux: `~/.config/eveapi`
/// - macOS: `~/Library/Application Support/eveapi`
/// - Windows: `%APPDATA%\eveapi`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir().map_or_else(|| PathBuf::from("."), |c| c.join(APP_DIR))
}

/// Returns the default cache directory (`~/.cache/eveapi` on Linux).
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(|| PathBuf::from("."), |c| c.join(APP_DIR))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

/// Returns the directory holding cached HTTP bodies.
pub fn default_http_cache_dir() -> PathBuf {
    default_cache_dir().join("http")
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// JSON Files
// ============================================================================

/// Ensures a directory exists; newly created directories are owner-only.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    debug!(path = %path.display(), "Creating directory");
    tokio::fs::create_dir_all(path).await?;
    restrict(path, 0o700).await
}

/// Saves `data` as pretty JSON.
///
/// Creates parent directories, writes through a temp file and a rename,
/// and restricts the file to its owner on Unix.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_vec_pretty(data)?;
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    tokio::fs::rename(&temp_path, path).await?;
    restrict(path, 0o600).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved JSON file");
    Ok(())
}

/// Loads a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

// ============================================================================
// Killmail Exports
// ============================================================================

/// Loads exported killmails; a missing file is an empty export.
///
/// A file that exists but does not parse is an error, so an export is
/// never silently replaced.
pub async fn load_records(path: &Path) -> Result<Vec<MergedRecord>, StoreError> {
    match load_json(path).await {
        Ok(records) => Ok(records),
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "No existing export");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Writes an export of merged killmails.
pub async fn save_records(path: &Path, records: &[MergedRecord]) -> Result<(), StoreError> {
    save_json(path, &records).await?;
    info!(path = %path.display(), records = records.len(), "Wrote killmail export");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
