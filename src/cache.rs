//! On-disk cache for GET responses.
//!
//! Entries are JSON files named after a SHA-256 digest of the resource, its
//! parameters and the credentials in use. A fresh entry short-circuits the
//! request; a stale entry is served only when the live request fails. Cache I/O
//! problems never fail a request.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    expire: Duration,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    modified: SystemTime,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ResponseCache {
            dir: dir.into(),
            expire: DEFAULT_EXPIRE,
        }
    }

    pub fn with_expire(mut self, expire: Duration) -> Self {
        self.expire = expire;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn expire(&self) -> Duration {
        self.expire
    }

    /// Cache file for the given key material.
    pub fn path_for(&self, key_material: &str) -> PathBuf {
        let digest = Sha256::digest(key_material.as_bytes());
        self.dir
            .join(format!("avatar-cycle.{}.json", hex::encode(digest)))
    }

    /// Serves `path` when fresh, otherwise calls `fetch` and stores its result.
    /// Falls back to the stale entry when `fetch` fails.
    pub fn get_or_fetch<F>(&self, path: &Path, expire: Option<Duration>, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let expire = expire.unwrap_or(self.expire);
        let cached = Self::load(path);

        if let Some(entry) = &cached {
            if Self::is_fresh(entry, expire) {
                tracing::debug!(path = %path.display(), "serving cached response");
                return Ok(entry.value.clone());
            }
        }

        match fetch() {
            Ok(value) => {
                self.store(path, &value);
                Ok(value)
            }
            Err(e) => match cached {
                Some(entry) => {
                    tracing::warn!(error = %e, path = %path.display(), "request failed, serving stale cache");
                    Ok(entry.value)
                }
                None => Err(e),
            },
        }
    }

    fn is_fresh(entry: &CacheEntry, expire: Duration) -> bool {
        entry
            .modified
            .checked_add(expire)
            .map_or(false, |deadline| deadline > SystemTime::now())
    }

    fn load(path: &Path) -> Option<CacheEntry> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let bytes = fs::read(path).ok()?;
        match serde_json::from_slice::<Value>(&bytes) {
            // an empty payload counts as a miss
            Ok(Value::Null) => None,
            Ok(value) => Some(CacheEntry { value, modified }),
            Err(e) => {
                tracing::debug!(error = %e, path = %path.display(), "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn store(&self, path: &Path, value: &Value) {
        if let Err(e) = Self::write_atomic(path, value) {
            tracing::debug!(error = %e, path = %path.display(), "failed to write cache entry");
        }
    }

    fn write_atomic(path: &Path, value: &Value) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_vec(value)?;
        let mut tmp_path = path.to_path_buf();
        tmp_path.set_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    }
}
