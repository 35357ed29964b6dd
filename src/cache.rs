use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::llm::Attachment;
use crate::normalize::FallbackPolicy;
use crate::prompt::OutputGrammar;

// No trailing slash, cnidarium convention
const CACHE_PREFIX: &str = "cache";

fn entry_key(key: &str) -> String {
    format!("{}/{}", CACHE_PREFIX, key)
}

/// A cached value with the time it was stored and how long it stays fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub stored_at: i64,
    pub ttl_secs: u64,
    pub payload: serde_json::Value,
}

impl CacheEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        now.saturating_sub(self.stored_at) >= self.ttl_secs as i64
    }
}

/// Content-addressed key for one upstream request. `fallback` is set when the
/// normalizer's fallback threshold shapes the cached value.
pub fn cache_key(
    grammar: OutputGrammar,
    grounded: bool,
    fallback: Option<FallbackPolicy>,
    prompt: &str,
    attachments: &[Attachment],
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(grammar.as_str().as_bytes());
    hasher.update(&[grounded as u8]);
    if let Some(policy) = fallback {
        hasher.update(&(policy.min_len as u64).to_le_bytes());
    }
    hasher.update(&(prompt.len() as u64).to_le_bytes());
    hasher.update(prompt.as_bytes());
    for attachment in attachments {
        hasher.update(attachment.mime_type.as_bytes());
        hasher.update(blake3::hash(&attachment.data).as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Keyed, time-boxed memoization store: memory in front of cnidarium.
/// `memory` mirrors every fresh entry in storage.
pub struct ResponseCache {
    storage: Storage,
    memory: RwLock<HashMap<String, CacheEntry>>,
    // Held from snapshot to commit; cnidarium rejects deltas forked from a stale version.
    commit_lock: Mutex<()>,
}

impl ResponseCache {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![CACHE_PREFIX.to_string()])
            .await
            .context("Failed to init cnidarium cache storage")?;
        let cache = Self {
            storage,
            memory: RwLock::new(HashMap::new()),
            commit_lock: Mutex::new(()),
        };
        cache.load().await?;
        Ok(cache)
    }

    /// Pull fresh entries into memory and purge expired ones from storage.
    async fn load(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.storage.latest_snapshot();
        let prefix = format!("{}/", CACHE_PREFIX);

        let mut fresh = HashMap::new();
        let mut stale = Vec::new();
        let mut stream = snapshot.prefix_raw(&prefix);
        while let Some(entry) = stream.next().await {
            let (key, bytes) = match entry {
                Ok(kv) => kv,
                Err(e) => {
                    warn!("Error reading cache stream: {}", e);
                    continue;
                }
            };
            let Some(k) = key.strip_prefix(&prefix) else {
                continue;
            };
            match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) if !entry.is_expired(now) => {
                    fresh.insert(k.to_string(), entry);
                }
                Ok(_) => stale.push(key.clone()),
                Err(e) => {
                    warn!(key = %k, error = %e, "dropping undecodable cache entry");
                    stale.push(key.clone());
                }
            }
        }
        drop(stream);

        if !stale.is_empty() {
            let mut delta = StateDelta::new(self.storage.latest_snapshot());
            for key in &stale {
                delta.delete(key.clone());
            }
            self.storage.commit(delta).await?;
        }

        info!(fresh = fresh.len(), purged = stale.len(), "response cache loaded");
        *self.memory.write().await = fresh;
        Ok(())
    }

    /// Fresh value for `key`, if any. Expired entries are removed on the way.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let now = chrono::Utc::now().timestamp();

        let Some(entry) = self.memory.read().await.get(key).cloned() else {
            return Ok(None);
        };

        if entry.is_expired(now) {
            debug!(key, "cache entry expired");
            self.remove(key).await?;
            return Ok(None);
        }

        match serde_json::from_value(entry.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "cached payload has unexpected shape, ignoring");
                Ok(None)
            }
        }
    }

    /// Store `value` under `key`, sweeping every other expired entry in the same commit.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let entry = CacheEntry {
            stored_at: now,
            ttl_secs: ttl.as_secs(),
            payload: serde_json::to_value(value).context("serialize cache payload")?,
        };
        let bytes = serde_json::to_vec(&entry).context("serialize CacheEntry")?;

        let _guard = self.commit_lock.lock().await;
        let expired: Vec<String> = self
            .memory
            .read()
            .await
            .iter()
            .filter(|(k, e)| k.as_str() != key && e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        for k in &expired {
            delta.delete(entry_key(k));
        }
        delta.put_raw(entry_key(key), bytes);
        self.storage.commit(delta).await?;

        let mut memory = self.memory.write().await;
        for k in &expired {
            memory.remove(k);
        }
        memory.insert(key.to_string(), entry);
        debug!(
            key,
            ttl_secs = ttl.as_secs(),
            swept = expired.len(),
            "cache entry stored"
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.delete(entry_key(key));
        self.storage.commit(delta).await?;
        self.memory.write().await.remove(key);
        Ok(())
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.commit_lock.lock().await;
        let mut keys: HashSet<String> = self.memory.read().await.keys().cloned().collect();

        let snapshot = self.storage.latest_snapshot();
        let prefix = format!("{}/", CACHE_PREFIX);
        let mut stream = snapshot.prefix_raw(&prefix);
        while let Some(entry) = stream.next().await {
            match entry {
                Ok((key, _)) => {
                    if let Some(k) = key.strip_prefix(&prefix) {
                        keys.insert(k.to_string());
                    }
                }
                Err(e) => {
                    warn!("Error reading cache stream: {}", e);
                }
            }
        }
        drop(stream);

        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        for key in &keys {
            delta.delete(entry_key(key));
        }
        self.storage.commit(delta).await?;
        self.memory.write().await.clear();

        debug!(removed = keys.len(), "cache cleared");
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry {
            stored_at: 1_000,
            ttl_secs: 60,
            payload: serde_json::Value::Null,
        };
        assert!(!entry.is_expired(1_000));
        assert!(!entry.is_expired(1_059));
        assert!(entry.is_expired(1_060));
    }

    #[test]
    fn test_zero_ttl_never_fresh() {
        let entry = CacheEntry {
            stored_at: 5,
            ttl_secs: 0,
            payload: serde_json::Value::Null,
        };
        assert!(entry.is_expired(5));
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = cache_key(OutputGrammar::Results, true, None, "prompt", &[]);
        let b = cache_key(OutputGrammar::Results, true, None, "prompt", &[]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_cache_key_varies_with_inputs() {
        let base = cache_key(OutputGrammar::Results, true, None, "prompt", &[]);
        assert_ne!(base, cache_key(OutputGrammar::TopicReport, true, None, "prompt", &[]));
        assert_ne!(base, cache_key(OutputGrammar::Results, false, None, "prompt", &[]));
        assert_ne!(base, cache_key(OutputGrammar::Results, true, None, "prompt2", &[]));
        let attachment = Attachment {
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        };
        assert_ne!(
            base,
            cache_key(OutputGrammar::Results, true, None, "prompt", &[attachment])
        );
    }

    #[test]
    fn test_cache_key_varies_with_fallback_policy() {
        let key = |min_len| {
            cache_key(
                OutputGrammar::Results,
                true,
                Some(FallbackPolicy { min_len }),
                "prompt",
                &[],
            )
        };
        assert_eq!(key(50), key(50));
        assert_ne!(key(50), key(80));
        assert_ne!(key(50), cache_key(OutputGrammar::Results, true, None, "prompt", &[]));
    }

    async fn test_cache() -> (ResponseCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path()).await.unwrap();
        (cache, dir)
    }

    async fn stored(cache: &ResponseCache, key: &str) -> bool {
        cache
            .storage
            .latest_snapshot()
            .get_raw(&entry_key(key))
            .await
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _dir) = test_cache().await;
        cache
            .set("k", &vec!["a".to_string()], Duration::from_secs(60))
            .await
            .unwrap();
        let value: Option<Vec<String>> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(vec!["a".to_string()]));
        assert!(cache.get::<Vec<String>>("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_sweeps_expired_entries() {
        let (cache, _dir) = test_cache().await;
        for i in 0..50 {
            cache
                .set(&format!("k{}", i), &i, Duration::ZERO)
                .await
                .unwrap();
        }
        cache
            .set("fresh", &"v", Duration::from_secs(3600))
            .await
            .unwrap();

        let memory = cache.memory.read().await;
        assert_eq!(memory.len(), 1);
        assert!(memory.contains_key("fresh"));
        drop(memory);

        assert!(!stored(&cache, "k0").await);
        assert!(!stored(&cache, "k49").await);
        assert!(stored(&cache, "fresh").await);
    }

    #[tokio::test]
    async fn test_expired_entry_removed_on_get() {
        let (cache, _dir) = test_cache().await;
        cache.set("k", &1u32, Duration::ZERO).await.unwrap();
        assert!(cache.get::<u32>("k").await.unwrap().is_none());
        assert!(!stored(&cache, "k").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sets_all_persist() {
        let (cache, _dir) = test_cache().await;
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .set(&format!("k{}", i), &i, Duration::from_secs(60))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for i in 0..16 {
            assert!(stored(&cache, &format!("k{}", i)).await);
        }
        assert_eq!(cache.clear().await.unwrap(), 16);
        assert!(!stored(&cache, "k0").await);
    }
}
