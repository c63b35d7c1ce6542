//! File-backed cache gateway
//!
//! Stores each key as a JSON file with `cached_at`/`expires_at` metadata in an
//! XDG-compliant cache directory (`~/.cache/flightbar/` on Linux). Expired
//! entries read as misses and are removed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::{CacheError, CacheGateway};

/// Distinguishes temp files of concurrent writers
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// The cached JSON document
    value: String,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the entry expires; `None` = never
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Cache gateway writing one JSON file per key
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileCache {
    /// Creates a FileCache using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "flightbar")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a FileCache with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    ///
    /// Keys are restricted to ASCII alphanumerics, `_` and `-` so they can
    /// never escape the cache directory.
    fn cache_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.cache_dir.join(format!("{}.json", key)))
    }

    /// Ensures the cache directory exists
    async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir).await
    }

    /// Reads an entry, treating unreadable files as absent
    async fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let content = fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache file");
                None
            }
        }
    }
}

#[async_trait]
impl CacheGateway for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.cache_path(key)?;
        let Some(entry) = self.read_entry(&path).await else {
            return Ok(None);
        };

        if entry.is_expired(Utc::now()) {
            debug!(key, "cache entry expired");
            // Best effort; a concurrent writer may already have replaced it
            let _ = fs::remove_file(&path).await;
            return Ok(None);
        }

        Ok(Some(entry.value.into_bytes()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        let path = self.cache_path(key)?;
        self.ensure_dir().await?;

        let value = String::from_utf8(value).map_err(|e| CacheError::InvalidData(e.to_string()))?;
        let now = Utc::now();
        let entry = CacheEntry {
            value,
            cached_at: now,
            expires_at: ttl_secs.and_then(|secs| expiry_after(now, secs)),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| CacheError::InvalidData(e.to_string()))?;

        // Write then rename so readers never see a half-written file
        let tmp_path = path.with_extension(format!("json.{}.tmp", unique_suffix()));
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.ensure_dir().await?;
        let probe = self.cache_dir.join(format!(".ping.{}", unique_suffix()));
        fs::write(&probe, b"ok").await?;
        fs::remove_file(&probe).await?;
        Ok(())
    }
}

/// Per-process, per-call suffix for scratch files
fn unique_suffix() -> String {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}.{}", std::process::id(), seq)
}

/// Expiry `secs` after `now`; `None` (never expires) when out of range
fn expiry_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let ttl = Duration::try_seconds(i64::try_from(secs).ok()?)?;
    now.checked_add_signed(ttl)
}
