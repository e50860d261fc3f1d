// Short-lived response cache for bridge queries.
//
// Keeps the host from hammering the bridge when it polls frequently.
// Entries live in memory and, when a cache directory is configured, are
// mirrored to one JSON file per key so a quick restart can reuse them.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A cached response together with the wall-clock time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    stored: Instant,
}

#[derive(Serialize, Deserialize)]
struct DiskEntry<T> {
    fetched_at: DateTime<Utc>,
    value: T,
}

/// Concurrent TTL cache keyed by query type + device id.
pub(crate) struct ResponseCache<T> {
    entries: DashMap<String, Entry<T>>,
    ttl: Duration,
    directory: Option<PathBuf>,
}

impl<T> ResponseCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub(crate) fn new(ttl: Duration, directory: Option<PathBuf>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            directory,
        }
    }

    /// Fresh entry for `key`, from memory first, then from the disk mirror.
    pub(crate) fn get(&self, key: &str) -> Option<Cached<T>> {
        if self.ttl.is_zero() {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.stored.elapsed() < self.ttl {
                trace!(key, "cache hit");
                return Some(Cached {
                    value: entry.value.clone(),
                    fetched_at: entry.fetched_at,
                });
            }
        }
        self.entries.remove_if(key, |_, e| e.stored.elapsed() >= self.ttl);

        self.read_disk(key)
    }

    pub(crate) fn insert(&self, key: &str, value: T, fetched_at: DateTime<Utc>) {
        if self.ttl.is_zero() {
            return;
        }
        self.write_disk(key, &value, fetched_at);
        self.entries.insert(
            key.to_owned(),
            Entry {
                value,
                fetched_at,
                stored: Instant::now(),
            },
        );
    }

    pub(crate) fn invalidate(&self, key: &str) {
        self.entries.remove(key);
        if let Some(path) = self.disk_path(key) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(error = %e, path = %path.display(), "cache file removal failed");
                }
            }
        }
    }

    // ── Disk mirror ──────────────────────────────────────────────────

    fn disk_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.directory.as_deref()?;
        Some(dir.join(file_name(key)))
    }

    fn read_disk(&self, key: &str) -> Option<Cached<T>> {
        let path = self.disk_path(key)?;
        let raw = std::fs::read(&path).ok()?;
        let entry: DiskEntry<T> = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, path = %path.display(), "ignoring unreadable cache file");
                return None;
            }
        };

        let age = (Utc::now() - entry.fetched_at).to_std().ok()?;
        if age >= self.ttl {
            return None;
        }

        trace!(key, "disk cache hit");
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: entry.value.clone(),
                fetched_at: entry.fetched_at,
                stored: Instant::now().checked_sub(age).unwrap_or_else(Instant::now),
            },
        );
        Some(Cached {
            value: entry.value,
            fetched_at: entry.fetched_at,
        })
    }

    fn write_disk(&self, key: &str, value: &T, fetched_at: DateTime<Utc>) {
        let Some(path) = self.disk_path(key) else {
            return;
        };
        let entry = DiskEntry {
            fetched_at,
            value: value.clone(),
        };
        let result = serde_json::to_vec(&entry)
            .map_err(std::io::Error::other)
            .and_then(|bytes| write_atomic(&path, &bytes));
        if let Err(e) = result {
            debug!(error = %e, path = %path.display(), "cache file write failed");
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Map a cache key onto a portable file name.
fn file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{safe}.json")
}
