//! Durable cache index: key -> entry, stored as pretty JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchError;

/// File name of the index inside the cache directory
pub const INDEX_FILE_NAME: &str = "cache_index.json";

/// One downloaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub identifier: String,
    pub path: PathBuf,
    pub fetched_at: DateTime<Utc>,
    pub source_url: String,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// Fresh entries are younger than `ttl` and still have their file.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl && self.path.is_file()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    /// Read the index at `path`. A missing file is an empty index; an
    /// unreadable one is logged and treated as empty.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Could not read cache index {}: {}", path.display(), e);
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt cache index {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Rewrite the whole index. Written to a sibling temp file first so a
    /// crash never leaves a half-written index behind.
    pub fn commit(&self, path: &Path) -> Result<(), FetchError> {
        let index_error = |reason: String| FetchError::Index {
            path: path.display().to_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| index_error(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| index_error(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| index_error(e.to_string()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// Keys of entries at least `older_than` old, or every key.
    pub fn expired_keys(&self, now: DateTime<Utc>, older_than: Option<Duration>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| match older_than {
                Some(threshold) => entry.age(now) >= threshold,
                None => true,
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
