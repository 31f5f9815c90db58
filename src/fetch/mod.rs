//! # Remote Asset Cache
//!
//! Resolves shareable drive links to local files. Each file is downloaded
//! once and reused while its cache entry is fresh; the index survives
//! process restarts and is rewritten after every change.

pub mod client;
pub mod clock;
pub mod index;
pub mod link;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};

pub use client::{Downloader, HttpDownloader};
pub use clock::{Clock, SystemClock};
pub use index::{CacheEntry, CacheIndex, INDEX_FILE_NAME};
pub use link::{cache_key, extract_identifier, recognize};

/// Download cache for remote media
pub struct RemoteAssetCache {
    dir: PathBuf,
    ttl: chrono::Duration,
    index_path: PathBuf,
    /// Single owner of the index; every commit happens under this lock
    index: Mutex<CacheIndex>,
    /// One async lock per cache key so concurrent resolves of the same
    /// file wait for a single download
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    downloader: Arc<dyn Downloader>,
    clock: Arc<dyn Clock>,
}

impl RemoteAssetCache {
    /// Open (or create) a cache in `dir` using HTTP and the system clock
    pub fn open<P: AsRef<Path>>(dir: P, ttl: Duration) -> Result<Self> {
        Self::with_parts(dir, ttl, Arc::new(HttpDownloader::new()), Arc::new(SystemClock))
    }

    /// Open a cache with an explicit downloader and clock
    pub fn with_parts<P: AsRef<Path>>(
        dir: P,
        ttl: Duration,
        downloader: Arc<dyn Downloader>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let index_path = dir.join(INDEX_FILE_NAME);
        let index = CacheIndex::load(&index_path);
        debug!("Opened asset cache {} with {} entries", dir.display(), index.len());

        Ok(Self {
            dir,
            ttl,
            index_path,
            index: Mutex::new(index),
            in_flight: Mutex::new(HashMap::new()),
            downloader,
            clock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of entries currently indexed
    pub fn len(&self) -> usize {
        self.lock_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a shareable link to a local file, downloading if needed
    pub async fn resolve(&self, url: &str) -> Result<PathBuf> {
        if !recognize(url) {
            return Err(FetchError::NotRecognized {
                url: url.to_string(),
            }
            .into());
        }

        let identifier = extract_identifier(url)?;
        let key = cache_key(&identifier);

        let slot = self.key_lock(&key);
        let result = {
            let _guard = slot.lock().await;
            self.fetch_or_reuse(&key, identifier, url).await
        };
        self.release_key(&key, &slot);

        result
    }

    async fn fetch_or_reuse(&self, key: &str, identifier: String, url: &str) -> Result<PathBuf> {
        if let Some(path) = self.fresh_path(key) {
            info!("Using cached file: {}", path.display());
            return Ok(path);
        }

        info!("Downloading remote asset: {}", identifier);
        let path = self.downloader.download(&identifier, &self.dir).await?;

        let entry = CacheEntry {
            identifier,
            path: path.clone(),
            fetched_at: self.clock.now(),
            source_url: url.to_string(),
        };

        let mut index = self.lock_index();
        index.insert(key.to_string(), entry);
        index.commit(&self.index_path)?;

        Ok(path)
    }

    /// Remove entries at least `older_than` old (all entries when `None`).
    ///
    /// Backing files are deleted best-effort. Returns how many entries
    /// were removed.
    pub fn evict(&self, older_than: Option<Duration>) -> Result<usize> {
        let threshold =
            older_than.map(|d| chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX));
        let now = self.clock.now();

        let mut index = self.lock_index();
        let keys = index.expired_keys(now, threshold);

        for key in &keys {
            if let Some(entry) = index.remove(key) {
                if entry.path.exists() {
                    match std::fs::remove_file(&entry.path) {
                        Ok(()) => debug!("Deleted cached file: {}", entry.path.display()),
                        Err(e) => warn!("Could not delete {}: {}", entry.path.display(), e),
                    }
                }
            }
        }

        index.commit(&self.index_path)?;
        info!("Cleared {} cached file(s)", keys.len());
        Ok(keys.len())
    }

    fn fresh_path(&self, key: &str) -> Option<PathBuf> {
        let now = self.clock.now();
        self.lock_index()
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.path.clone())
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.entry(key.to_string()).or_default().clone()
    }

    /// Drop the slot for `key` unless another resolve still holds it
    fn release_key(&self, key: &str, slot: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // one reference in the map, one held by the caller
        if Arc::strong_count(slot) == 2 {
            in_flight.remove(key);
        }
    }

    fn lock_index(&self) -> MutexGuard<'_, CacheIndex> {
        self.index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
