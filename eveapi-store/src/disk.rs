//! On-disk cache backend.
//!
//! One file per key. The first line holds the RFC 3339 expiry, the rest of
//! the file is the cached body byte for byte. File names are the
//! form-urlencoded key, so any key maps to a single flat file. Writes go
//! through a uniquely named temp file in the same directory and a rename.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use eveapi_core::CacheRepository;
use tracing::{debug, warn};

use crate::error::StoreError;

const EXTENSION: &str = "cache";
const TEMP_SUFFIX: &str = ".tmp";

/// Longest TTL written to disk; keeps the expiry header a four-digit year.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache backend that survives process restarts.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Creates a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened disk cache");
        Ok(Self { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that stores `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Removes every expired or unreadable entry; returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let keep = match entry_kind(&path) {
                Some(EntryKind::Cache) => {
                    matches!(read_entry(&path), Ok((expires_at, _)) if now < expires_at)
                }
                Some(EntryKind::Temp) => false,
                None => true,
            };
            if !keep {
                remove_if_present(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes every entry, including temp files left by interrupted writes.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if entry_kind(&path).is_some() {
                remove_if_present(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn write(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl.min(MAX_TTL)).unwrap_or_else(|_| chrono::Duration::zero());
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).unwrap_or(now);

        let mut contents = expires_at.to_rfc3339().into_bytes();
        contents.push(b'\n');
        contents.extend_from_slice(value);

        // Each writer gets its own temp file; it is removed on drop if the
        // rename never happens.
        let mut temp = tempfile::Builder::new()
            .prefix(".entry-")
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)?;
        temp.write_all(&contents)?;
        temp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

enum EntryKind {
    Cache,
    Temp,
}

fn entry_kind(path: &Path) -> Option<EntryKind> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(TEMP_SUFFIX) {
        Some(EntryKind::Temp)
    } else if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
        Some(EntryKind::Cache)
    } else {
        None
    }
}

/// Another process may have removed the file first.
fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn read_entry(path: &Path) -> Result<(DateTime<Utc>, Vec<u8>), StoreError> {
    let mut contents = std::fs::read(path)?;
    let corrupt = |reason: &str| StoreError::CorruptEntry {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let split = contents
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt("missing header"))?;
    let header = std::str::from_utf8(&contents[..split]).map_err(|_| corrupt("header is not UTF-8"))?;
    let expires_at = DateTime::parse_from_rfc3339(header)
        .map_err(|e| corrupt(&e.to_string()))?
        .with_timezone(&Utc);

    let body = contents.split_off(split + 1);
    Ok((expires_at, body))
}

impl CacheRepository for DiskCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match read_entry(&path) {
            Ok((expires_at, body)) if Utc::now() < expires_at => Some(body),
            Ok(_) => {
                debug!(key, "Disk cache entry expired");
                let _ = std::fs::remove_file(&path);
                None
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(key, error = %e, "Dropping unreadable cache entry");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if let Err(e) = self.write(key, &value, ttl) {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }

    fn delete(&self, key: &str) {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key, error = %e, "Failed to delete cache entry"),
        }
    }
}
