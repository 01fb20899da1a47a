//! # Cache
//!
//! Small TTL key/value store kept as JSON files in one directory.
//!
//! - Files are named `lgtm_generator_<sha256(key)>.json`.
//! - Each entry stores `{ data, timestamp, ttl }` with the timestamp in epoch
//!   milliseconds and the ttl in seconds.
//! - Reads drop expired entries. Failures are logged and treated as misses.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use shared::now_ms;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

pub const CACHE_PREFIX: &str = "lgtm_generator_";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    timestamp: i64,
    /// Seconds.
    ttl: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: i64) -> bool {
        let age_ms = now - self.timestamp;
        age_ms > (self.ttl as i64).saturating_mul(1000)
    }
}

#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<user cache dir>/lgtm-generator`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("lgtm-generator"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{CACHE_PREFIX}{digest}.json"))
    }

    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl_secs: u64) -> ClientResult<()> {
        self.set_at(key, data, ttl_secs, now_ms())
    }

    pub fn set_at<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl_secs: u64,
        now: i64,
    ) -> ClientResult<()> {
        let entry = CacheEntry {
            data,
            timestamp: now,
            ttl: ttl_secs,
        };
        let json = serde_json::to_vec(&entry).map_err(|e| ClientError::Cache(e.to_string()))?;

        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), json)?;

        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, now_ms())
    }

    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: i64) -> Option<T> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).ok()?;

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read cache entry {}: {e}", path.display());
                return None;
            }
        };

        if entry.is_expired(now) {
            remove(&path);
            return None;
        }

        Some(entry.data)
    }

    /// Removes expired and unreadable entries. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        self.clear_expired_at(now_ms())
    }

    pub fn clear_expired_at(&self, now: i64) -> usize {
        let mut removed = 0;

        for path in self.entries() {
            let expired = fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<CacheEntry<serde_json::Value>>(&bytes).ok())
                .is_none_or(|entry| entry.is_expired(now));

            if expired {
                remove(&path);
                removed += 1;
            }
        }

        removed
    }

    /// Removes every entry this cache owns; other files are left alone.
    pub fn clear_all(&self) -> usize {
        let paths = self.entries();
        let count = paths.len();
        paths.iter().for_each(|path| remove(path));
        count
    }

    fn entries(&self) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(CACHE_PREFIX))
            })
            .collect()
    }
}

fn remove(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove cache entry {}: {e}", path.display());
    }
}
