//! Cache backing stores
//!
//! One tagged [`CacheStore`] fronts two implementations: an in-process
//! capacity-bounded store with oldest-first eviction, and (behind the
//! `durable-cache` feature) a rocksdb-backed durable store whose values are
//! stored as JSON for debuggability. The orchestrator only ever sees the
//! tagged type.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::types::CoordinatedResponse;

/// One cached coordinated response, lazily expired on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fixed-length hashed key
    pub key: String,

    /// Normalized message retained for pattern-based clearing
    pub normalized_message: String,

    pub response: CoordinatedResponse,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Reads served from this entry
    pub hit_count: u64,

    /// Response confidence at write time
    pub confidence: f64,
}

impl CacheEntry {
    pub fn new(key: String, normalized_message: String, response: CoordinatedResponse) -> Self {
        let now = Utc::now();
        let confidence = response.confidence;
        Self {
            key,
            normalized_message,
            response,
            created_at: now,
            expires_at: now,
            hit_count: 0,
            confidence,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process capacity-bounded store. Eviction is oldest-first by insertion;
/// hits do not refresh an entry's position.
pub struct InMemoryStore {
    inner: Mutex<InMemoryInner>,
    capacity: usize,
}

struct InMemoryInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order, front = oldest
    order: VecDeque<String>,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(InMemoryInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, InMemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn set(&self, entry: CacheEntry) -> StoreResult<()> {
        let mut inner = self.lock()?;

        if inner.entries.contains_key(&entry.key) {
            // Overwrite refreshes the entry's age.
            let key = entry.key.clone();
            inner.order.retain(|k| k != &key);
            inner.order.push_back(key.clone());
            inner.entries.insert(key, entry);
            return Ok(());
        }

        if inner.entries.len() == self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(entry.key.clone());
        inner.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn increment_hits(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let mut inner = self.lock()?;
        Ok(inner.entries.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            entry.clone()
        }))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
        Ok(())
    }

    fn clear_matching(&self, pattern: Option<&str>) -> StoreResult<usize> {
        let mut inner = self.lock()?;
        let keys: Vec<String> = inner
            .entries
            .values()
            .filter(|e| matches_pattern(e, pattern))
            .map(|e| e.key.clone())
            .collect();

        let InMemoryInner { entries, order } = &mut *inner;
        for key in &keys {
            entries.remove(key);
        }
        order.retain(|k| entries.contains_key(k));
        Ok(keys.len())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.entries.len())
    }
}

/// A pattern matches an entry by substring of its normalized message, or by
/// exact hashed key. `None` matches everything.
fn matches_pattern(entry: &CacheEntry, pattern: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(p) => entry.normalized_message.contains(p) || entry.key == p,
    }
}

/// Tagged cache backing store.
pub enum CacheStore {
    InMemory(InMemoryStore),
    #[cfg(feature = "durable-cache")]
    Durable(durable::DurableStore),
}

impl CacheStore {
    /// In-process store with the given capacity.
    pub fn in_memory(capacity: usize) -> Self {
        Self::InMemory(InMemoryStore::new(capacity))
    }

    /// Durable rocksdb-backed store at the given path.
    #[cfg(feature = "durable-cache")]
    pub fn durable(path: impl Into<std::path::PathBuf>) -> StoreResult<Self> {
        Ok(Self::Durable(durable::DurableStore::open(path)?))
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        match self {
            Self::InMemory(store) => store.get(key),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.get(key),
        }
    }

    /// Store an entry with the given TTL (expiry computed from its creation
    /// time).
    pub async fn set(&self, mut entry: CacheEntry, ttl: Duration) -> StoreResult<()> {
        entry.expires_at = entry.created_at
            + chrono::Duration::from_std(ttl)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
        match self {
            Self::InMemory(store) => store.set(entry),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.set(entry),
        }
    }

    /// Bump an entry's hit count under the store's own lock, returning the
    /// updated entry. Concurrent bumps on one key never lose an increment,
    /// and the entry's eviction age is not refreshed.
    pub async fn increment_hits(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        match self {
            Self::InMemory(store) => store.increment_hits(key),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.increment_hits(key),
        }
    }

    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        match self {
            Self::InMemory(store) => store.delete(key),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.delete(key),
        }
    }

    /// Remove entries matching the pattern (all entries when `None`),
    /// returning how many were removed.
    pub async fn clear_matching(&self, pattern: Option<&str>) -> StoreResult<usize> {
        match self {
            Self::InMemory(store) => store.clear_matching(pattern),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.clear_matching(pattern),
        }
    }

    pub async fn len(&self) -> StoreResult<usize> {
        match self {
            Self::InMemory(store) => store.len(),
            #[cfg(feature = "durable-cache")]
            Self::Durable(store) => store.len(),
        }
    }
}

#[cfg(feature = "durable-cache")]
mod durable {
    //! rocksdb-backed durable store; values are JSON for debuggability.

    use std::path::PathBuf;
    use std::sync::RwLock;

    use rocksdb::{Options, DB};

    use super::{matches_pattern, CacheEntry};
    use crate::error::{StoreError, StoreResult};

    pub struct DurableStore {
        db: RwLock<DB>,
    }

    impl DurableStore {
        pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            let db = DB::open(&opts, path.into())?;
            Ok(Self {
                db: RwLock::new(db),
            })
        }

        fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, DB>> {
            self.db
                .read()
                .map_err(|_| StoreError::Unavailable("durable store lock poisoned".to_string()))
        }

        fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, DB>> {
            self.db
                .write()
                .map_err(|_| StoreError::Unavailable("durable store lock poisoned".to_string()))
        }

        pub fn get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
            let db = self.read()?;
            match db.get(key.as_bytes())? {
                Some(bytes) => {
                    let entry = serde_json::from_slice(&bytes)
                        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                    Ok(Some(entry))
                }
                None => Ok(None),
            }
        }

        pub fn set(&self, entry: CacheEntry) -> StoreResult<()> {
            let bytes = serde_json::to_vec(&entry)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let db = self.read()?;
            db.put(entry.key.as_bytes(), bytes)?;
            Ok(())
        }

        pub fn delete(&self, key: &str) -> StoreResult<()> {
            let db = self.read()?;
            db.delete(key.as_bytes())?;
            Ok(())
        }

        /// Read-modify-write under the exclusive lock so concurrent bumps on
        /// one key serialize.
        pub fn increment_hits(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
            let db = self.write()?;
            let bytes = match db.get(key.as_bytes())? {
                Some(bytes) => bytes,
                None => return Ok(None),
            };
            let mut entry: CacheEntry = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            entry.hit_count += 1;

            let updated = serde_json::to_vec(&entry)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            db.put(key.as_bytes(), updated)?;
            Ok(Some(entry))
        }

        pub fn clear_matching(&self, pattern: Option<&str>) -> StoreResult<usize> {
            let db = self.read()?;
            let mut to_delete = Vec::new();

            for item in db.iterator(rocksdb::IteratorMode::Start) {
                let (key, value) = item?;
                let entry: CacheEntry = match serde_json::from_slice(&value) {
                    Ok(entry) => entry,
                    // Unreadable entries are cleared along with everything
                    // else on an unfiltered clear.
                    Err(_) => {
                        if pattern.is_none() {
                            to_delete.push(key.to_vec());
                        }
                        continue;
                    }
                };
                if matches_pattern(&entry, pattern) {
                    to_delete.push(key.to_vec());
                }
            }

            let count = to_delete.len();
            for key in to_delete {
                db.delete(key)?;
            }
            Ok(count)
        }

        pub fn len(&self) -> StoreResult<usize> {
            let db = self.read()?;
            Ok(db.iterator(rocksdb::IteratorMode::Start).count())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponderAnswer;

    fn entry(key: &str, message: &str) -> CacheEntry {
        let answer = ResponderAnswer::new("fin", "financial", "text", 0.8);
        CacheEntry::new(
            key.to_string(),
            message.to_string(),
            CoordinatedResponse::from_primary(answer),
        )
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = CacheStore::in_memory(4);
        store
            .set(entry("k1", "grow revenue"), Duration::from_secs(60))
            .await
            .unwrap();

        let found = store.get("k1").await.unwrap().unwrap();
        assert_eq!(found.normalized_message, "grow revenue");
        assert!(found.expires_at > found.created_at);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_first() {
        let store = CacheStore::in_memory(2);
        let ttl = Duration::from_secs(60);
        store.set(entry("k1", "one"), ttl).await.unwrap();
        store.set(entry("k2", "two"), ttl).await.unwrap();
        store.set(entry("k3", "three"), ttl).await.unwrap();

        assert!(store.get("k1").await.unwrap().is_none());
        assert!(store.get("k2").await.unwrap().is_some());
        assert!(store.get("k3").await.unwrap().is_some());
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_hit_bump_does_not_refresh_age() {
        let store = CacheStore::in_memory(2);
        let ttl = Duration::from_secs(60);
        store.set(entry("k1", "one"), ttl).await.unwrap();
        store.set(entry("k2", "two"), ttl).await.unwrap();

        // A hit on k1 must leave it the eviction victim.
        let bumped = store.increment_hits("k1").await.unwrap().unwrap();
        assert_eq!(bumped.hit_count, 1);

        store.set(entry("k3", "three"), ttl).await.unwrap();
        assert!(store.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hit_bump_on_missing_key_reports_none() {
        let store = CacheStore::in_memory(2);
        assert!(store.increment_hits("ghost").await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_hit_bumps_all_land() {
        let store = std::sync::Arc::new(CacheStore::in_memory(4));
        store
            .set(entry("k1", "grow revenue"), Duration::from_secs(60))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_hits("k1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let found = store.get("k1").await.unwrap().unwrap();
        assert_eq!(found.hit_count, 10);
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = CacheStore::in_memory(2);
        store
            .set(entry("k1", "one"), Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("k1").await.unwrap();
        assert!(store.get("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_by_pattern_matches_normalized_message() {
        let store = CacheStore::in_memory(8);
        let ttl = Duration::from_secs(60);
        store.set(entry("k1", "grow revenue"), ttl).await.unwrap();
        store.set(entry("k2", "cut costs"), ttl).await.unwrap();
        store.set(entry("k3", "revenue forecast"), ttl).await.unwrap();

        let cleared = store.clear_matching(Some("revenue")).await.unwrap();
        assert_eq!(cleared, 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.get("k2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = CacheStore::in_memory(8);
        let ttl = Duration::from_secs(60);
        store.set(entry("k1", "one"), ttl).await.unwrap();
        store.set(entry("k2", "two"), ttl).await.unwrap();

        assert_eq!(store.clear_matching(None).await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[cfg(feature = "durable-cache")]
    #[tokio::test]
    async fn test_durable_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::durable(dir.path().join("cache.db")).unwrap();

        store
            .set(entry("k1", "grow revenue"), Duration::from_secs(60))
            .await
            .unwrap();
        let found = store.get("k1").await.unwrap().unwrap();
        assert_eq!(found.normalized_message, "grow revenue");

        store.delete("k1").await.unwrap();
        assert!(store.get("k1").await.unwrap().is_none());
    }
}
