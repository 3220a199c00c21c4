use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::util::env::{env_opt, env_parse};

/// What lands on disk for every cached key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    cached_at: DateTime<Utc>,
    payload: Value,
}

/// Two-tier payload cache: an in-memory map in front of JSON blobs on disk.
///
/// Disk blobs survive restarts and double as the stale fallback when an
/// upstream fetch fails. File names are the SHA-1 hex of the cache key.
pub struct BlobCache {
    dir: PathBuf,
    /// Stale fallback only applies to keys whose requested TTL sits under
    /// this threshold; long-lived resources fail loudly instead.
    stale_fallback_max_ttl: Duration,
    memory: Mutex<HashMap<String, Envelope>>,
}

impl BlobCache {
    /// Env: CACHE_DIR (default "cache"), STALE_FALLBACK_MAX_TTL_MIN
    /// (default 360).
    pub fn from_env() -> Result<Self> {
        let dir = env_opt("CACHE_DIR").unwrap_or_else(|| "cache".into());
        let stale_min = env_parse("STALE_FALLBACK_MAX_TTL_MIN", 360u64);
        Self::new(dir.into(), Duration::from_secs(stale_min * 60))
    }

    pub fn new(dir: PathBuf, stale_fallback_max_ttl: Duration) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache dir {}", dir.display()))?;
        Ok(Self {
            dir,
            stale_fallback_max_ttl,
            memory: Mutex::new(HashMap::new()),
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Resolve `key` through memory, then disk, then `fetch_fn`.
    ///
    /// The lock spans the whole check-then-write sequence, so two concurrent
    /// misses on the same key cannot both invoke `fetch_fn`. On fetch failure
    /// a stale disk blob is served instead, but only for short-TTL keys.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        force_refresh: bool,
        fetch_fn: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let mut memory = self.memory.lock().await;
        let now = Utc::now();

        if !force_refresh {
            if let Some(entry) = memory.get(key) {
                if is_fresh(entry.cached_at, now, ttl) {
                    debug!(key, "memory cache hit");
                    return Ok(entry.payload.clone());
                }
            }
            if let Some(entry) = self.read_disk_fresh(key, ttl) {
                debug!(key, "disk cache hit");
                memory.insert(key.to_string(), entry.clone());
                return Ok(entry.payload);
            }
        }

        debug!(key, force_refresh, "cache miss, fetching");
        match fetch_fn().await {
            Ok(payload) => {
                let entry = Envelope {
                    cached_at: now,
                    payload,
                };
                self.write_disk(key, &entry);
                memory.insert(key.to_string(), entry.clone());
                Ok(entry.payload)
            }
            Err(err) => {
                if ttl < self.stale_fallback_max_ttl {
                    if let Some(entry) = self.read_disk_any(key) {
                        warn!(key, error = %err, "fetch failed, serving stale disk entry");
                        return Ok(entry.payload);
                    }
                }
                Err(err)
            }
        }
    }

    /// Disk freshness is judged by file mtime; the envelope's cached_at
    /// rides along for the memory tier.
    fn read_disk_fresh(&self, key: &str, ttl: Duration) -> Option<Envelope> {
        let path = self.blob_path(key);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = std::time::SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age >= ttl {
            return None;
        }
        self.read_disk_any(key)
    }

    fn read_disk_any(&self, key: &str) -> Option<Envelope> {
        let path = self.blob_path(key);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable cache blob, ignoring");
                None
            }
        }
    }

    /// A blob that fails to write degrades the cache to memory-only for that
    /// key; serving still works.
    fn write_disk(&self, key: &str, entry: &Envelope) {
        let path = self.blob_path(key);
        match serde_json::to_string(entry) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&path, raw) {
                    warn!(path = %path.display(), error = %err, "failed to write cache blob");
                }
            }
            Err(err) => warn!(key, error = %err, "failed to serialize cache blob"),
        }
    }
}

fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age = now
        .signed_duration_since(cached_at)
        .to_std()
        .unwrap_or_default();
    age < ttl
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn cache_in(dir: &std::path::Path) -> BlobCache {
        BlobCache::new(dir.to_path_buf(), HOUR).unwrap()
    }

    async fn seed(cache: &BlobCache, key: &str, payload: Value) {
        cache
            .get_or_fetch(key, Duration::from_secs(60), false, || async {
                Ok::<_, anyhow::Error>(payload)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_hit_never_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_fetch("scoreboard:2025-26", HOUR, false, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(json!({"games": 3})) }
                })
                .await
                .unwrap();
            assert_eq!(got["games"], 3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_fresh_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_fetch("k", HOUR, true, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(json!(1)) }
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disk_blob_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        seed(&cache_in(dir.path()), "standings:2025", json!({"teams": 30})).await;

        let reopened = cache_in(dir.path());
        let calls = AtomicUsize::new(0);
        let got = reopened
            .get_or_fetch("standings:2025", HOUR, false, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!(null)) }
            })
            .await
            .unwrap();

        assert_eq!(got["teams"], 30);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_fetch_serves_stale_blob_for_short_ttls() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        seed(&cache, "k", json!({"v": "old"})).await;

        // Zero TTL makes the existing blob stale for the freshness check
        // while leaving it available as a fallback.
        let got = cache
            .get_or_fetch("k", Duration::ZERO, false, || async {
                anyhow::bail!("upstream down")
            })
            .await
            .unwrap();
        assert_eq!(got["v"], "old");
    }

    #[tokio::test]
    async fn failed_fetch_propagates_for_long_lived_ttls() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BlobCache::new(dir.path().to_path_buf(), Duration::ZERO).unwrap();
        seed(&cache, "k", json!({"v": "old"})).await;

        let err = cache
            .get_or_fetch("k", Duration::ZERO, true, || async {
                anyhow::bail!("upstream down")
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn blob_names_are_sha1_hex_of_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let path = cache.blob_path("roster:BOS");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 40 + ".json".len());
        assert!(name.ends_with(".json"));
        assert_ne!(cache.blob_path("roster:LAL"), path);
    }
}
