//! JSON-file cache keyed by namespace and key, with per-read TTL.
//!
//! Each entry lives in `<dir>/<sha256("{namespace}:{key}")>.json` as
//! `{"cached_at": <RFC 3339>, "data": <value>}`. Expired and unreadable entries
//! are removed on read. Write failures are logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_models::error::{ModelError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub mod namespace {
    pub const USER_ID: &str = "user_id";
    pub const INTERACTION_SCORES: &str = "interaction_scores";
    pub const USER_TOP_POSTS: &str = "user_top_posts";
    pub const PARTNER_ANALYSIS: &str = "partner_analysis";
    pub const NETWORK_STRATEGY: &str = "network_strategy";
}

const HOUR: u64 = 3600;
pub const USER_ID_TTL: Duration = Duration::from_secs(168 * HOUR);
pub const USER_TOP_POSTS_TTL: Duration = Duration::from_secs(6 * HOUR);
pub const PARTNER_ANALYSIS_TTL: Duration = Duration::from_secs(48 * HOUR);
pub const NETWORK_STRATEGY_TTL: Duration = Duration::from_secs(48 * HOUR);

/// Saturates at `Duration::MAX` for TTLs too large to represent.
pub fn hours(h: f64) -> Duration {
    Duration::try_from_secs_f64((h * HOUR as f64).max(0.0)).unwrap_or(Duration::MAX)
}

#[derive(Serialize, Deserialize)]
struct Entry<T> {
    cached_at: DateTime<Utc>,
    data: T,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            ModelError::Cache(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", namespace, key).as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str, ttl: Duration) -> Option<T> {
        let path = self.entry_path(namespace, key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(namespace, key, error = %e, "Cache read failed");
                return None;
            }
        };

        let entry: Entry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(namespace, key, error = %e, "Corrupt cache entry, removing");
                remove_quietly(&path);
                return None;
            }
        };

        // Entries stamped in the future count as fresh.
        let age = Utc::now()
            .signed_duration_since(entry.cached_at)
            .to_std()
            .unwrap_or_default();
        if age > ttl {
            debug!(namespace, key, age_secs = age.as_secs(), "Cache entry expired");
            remove_quietly(&path);
            return None;
        }

        debug!(namespace, key, "Cache hit");
        Some(entry.data)
    }

    pub fn set<T: Serialize>(&self, namespace: &str, key: &str, value: &T) {
        self.write_entry(namespace, key, value, Utc::now());
    }

    fn write_entry<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        cached_at: DateTime<Utc>,
    ) {
        let entry = Entry {
            cached_at,
            data: value,
        };
        let result = serde_json::to_string(&entry)
            .map_err(ModelError::from)
            .and_then(|json| {
                fs::write(self.entry_path(namespace, key), json).map_err(ModelError::from)
            });
        if let Err(e) = result {
            warn!(namespace, key, error = %e, "Cache write failed");
        }
    }

    pub fn invalidate(&self, namespace: &str, key: &str) {
        remove_quietly(&self.entry_path(namespace, key));
    }

    /// Removes every entry. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove cache entry");
        }
    }
}
