//! File-backed cache of analysis results.
//!
//! One JSON file per key under the cache directory. Keys hash the analysis
//! kind together with a prefix of the document text, so two documents that
//! share the prefix share an entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzer::schema::AnalysisKind;
use crate::error::{AppError, Result};

pub const DEFAULT_KEY_PREFIX_CHARS: usize = 5000;
pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub analysis_kind: AnalysisKind,
    pub cached_at: DateTime<Utc>,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_size_bytes: u64,
    pub cache_dir: PathBuf,
}

#[derive(Debug)]
pub struct AnalysisCache {
    cache_dir: PathBuf,
    ttl: Duration,
    key_prefix_chars: Option<usize>,
}

impl AnalysisCache {
    pub fn new(cache_dir: impl Into<PathBuf>, ttl_hours: i64) -> Result<Self> {
        let ttl = ttl_from_hours(ttl_hours)?;
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(AnalysisCache {
            cache_dir,
            ttl,
            key_prefix_chars: Some(DEFAULT_KEY_PREFIX_CHARS),
        })
    }

    /// `None` hashes the whole document instead of a prefix.
    pub fn with_key_prefix(mut self, chars: Option<usize>) -> Self {
        self.key_prefix_chars = chars;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_key(&self, text: &str, kind: AnalysisKind) -> String {
        let hashed: &str = match self.key_prefix_chars {
            Some(limit) => match text.char_indices().nth(limit) {
                Some((end, _)) => &text[..end],
                None => text,
            },
            None => text,
        };

        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(hashed.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    pub fn get(&self, text: &str, kind: AnalysisKind) -> Option<Value> {
        self.get_at(text, kind, Utc::now())
    }

    /// Looks up an entry as of `now`. Expired entries are deleted on the spot.
    pub fn get_at(&self, text: &str, kind: AnalysisKind, now: DateTime<Utc>) -> Option<Value> {
        let key = self.cache_key(text, kind);
        let path = self.entry_path(&key);

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache miss: {} ({})", kind, &key[..8]);
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if now - entry.cached_at > self.ttl {
            info!("Cache entry expired: {} ({})", kind, &key[..8]);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to evict expired cache entry {}: {}", path.display(), e);
            }
            return None;
        }

        info!("Cache hit: {} ({}...)", kind, &key[..8]);
        Some(entry.result)
    }

    /// Stores a result. Failures are logged and reported as `false`.
    pub fn set(&self, text: &str, kind: AnalysisKind, result: &Value) -> bool {
        let key = self.cache_key(text, kind);
        let path = self.entry_path(&key);
        let entry = CacheEntry {
            cache_key: key.clone(),
            analysis_kind: kind,
            cached_at: Utc::now(),
            result: result.clone(),
        };

        let written = serde_json::to_vec_pretty(&entry)
            .map_err(|e| e.to_string())
            .and_then(|bytes| fs::write(&path, bytes).map_err(|e| e.to_string()));

        match written {
            Ok(()) => {
                info!("Cached {} ({}...)", kind, &key[..8]);
                true
            }
            Err(e) => {
                warn!("Failed to write cache entry {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Removes every entry and returns how many files were deleted.
    pub fn clear(&self) -> usize {
        let mut count = 0;
        for path in self.entry_files() {
            match fs::remove_file(&path) {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to remove cache entry {}: {}", path.display(), e),
            }
        }

        info!("Cleared {} cache entries", count);
        count
    }

    pub fn stats(&self) -> CacheStats {
        let files = self.entry_files();
        let total_size_bytes = files
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();

        CacheStats {
            count: files.len(),
            total_size_bytes,
            cache_dir: self.cache_dir.clone(),
        }
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(e) => {
                warn!("Failed to list cache directory {}: {}", self.cache_dir.display(), e);
                Vec::new()
            }
        }
    }
}

/// Rejects TTLs chrono cannot represent.
pub fn ttl_from_hours(hours: i64) -> Result<Duration> {
    Duration::try_hours(hours)
        .ok_or_else(|| AppError::ConfigError(format!("CACHE_TTL_HOURS out of range: {}", hours)))
}
