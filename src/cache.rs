//! Task result cache keyed by task input, with time-based expiration.
//!
//! Entries live in memory and, when a directory is configured, are also
//! written there as one JSON file per key so later runs can reuse them.
//! Expired or unreadable files are removed on lookup.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub struct ResultCache<V> {
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    cache_dir: Option<PathBuf>,
    ttl: Duration,
}

impl<V> Clone for ResultCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            cache_dir: self.cache_dir.clone(),
            ttl: self.ttl,
        }
    }
}

impl<V> ResultCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// In-memory cache only
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cache_dir: None,
            ttl,
        }
    }

    /// Cache that also persists entries under `cache_dir`
    pub fn with_file_cache(ttl: Duration, cache_dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
            ..Self::new(ttl)
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if !entry.is_expired() {
                    debug!(key, cached_at = %entry.cached_at, "Cache hit");
                    return Some(entry.value.clone());
                }
            }
        }

        {
            let mut entries = self.entries.write().await;
            if entries.get(key).is_some_and(|entry| entry.is_expired()) {
                entries.remove(key);
            }
        }

        let entry = self.load_from_file(key).await?;
        debug!(key, cached_at = %entry.cached_at, "Cache hit (file)");
        let value = entry.value.clone();
        self.entries.write().await.insert(key.to_string(), entry);
        Some(value)
    }

    pub async fn insert(&self, key: &str, value: V) {
        let cached_at = Utc::now();
        let expires_at = cached_at
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        let entry = CacheEntry {
            value,
            cached_at,
            expires_at,
        };

        self.save_to_file(key, &entry).await;
        self.entries.write().await.insert(key.to_string(), entry);
    }

    pub async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();

        if let Some(cache_dir) = &self.cache_dir {
            if tokio::fs::try_exists(cache_dir).await? {
                let mut dir = tokio::fs::read_dir(cache_dir).await?;
                while let Some(file) = dir.next_entry().await? {
                    let path = file.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        tokio::fs::remove_file(&path).await?;
                    }
                }
            }
        }

        Ok(())
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", encoded)))
    }

    async fn load_from_file(&self, key: &str) -> Option<CacheEntry<V>> {
        let file_path = self.file_path(key)?;
        let content = tokio::fs::read_to_string(&file_path).await.ok()?;

        match serde_json::from_str::<CacheEntry<V>>(&content) {
            Ok(entry) if !entry.is_expired() => Some(entry),
            Ok(_) => {
                debug!(key, path = %file_path.display(), "Removing expired cache file");
                let _ = tokio::fs::remove_file(&file_path).await;
                None
            }
            Err(e) => {
                warn!(key, path = %file_path.display(), "Removing unreadable cache file: {}", e);
                let _ = tokio::fs::remove_file(&file_path).await;
                None
            }
        }
    }

    async fn save_to_file(&self, key: &str, entry: &CacheEntry<V>) {
        let (Some(cache_dir), Some(file_path)) = (&self.cache_dir, self.file_path(key)) else {
            return;
        };

        if let Err(e) = tokio::fs::create_dir_all(cache_dir).await {
            warn!("Failed to create cache directory {}: {}", cache_dir.display(), e);
            return;
        }

        match serde_json::to_string(entry) {
            Ok(content) => {
                if let Err(e) = tokio::fs::write(&file_path, content).await {
                    warn!("Failed to write cache file {}: {}", file_path.display(), e);
                }
            }
            Err(e) => warn!(key, "Failed to serialize cache entry: {}", e),
        }
    }
}
