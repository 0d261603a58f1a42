//! Semantic response cache
//!
//! Sits in front of routing: a hit returns the stored coordinated response
//! (annotated with hit metadata) without touching any responder. Keys are
//! derived from the normalized message plus a coarse context fingerprint, so
//! rephrased requests with comparable context share entries.
//!
//! Expiry is lazy: an expired entry is detected and removed on the read that
//! finds it. Any store failure is treated as a miss; the cache never takes
//! the pipeline down.

mod normalize;
mod store;

pub use normalize::{cache_key, context_fingerprint, MessageNormalizer};
pub use store::{CacheEntry, CacheStore};

use tracing::{debug, warn};

use crate::config::CachePolicy;
use crate::types::{CacheInfo, Context, CoordinatedResponse};

pub struct ResponseCache {
    policy: CachePolicy,
    store: CacheStore,
    normalizer: MessageNormalizer,
}

impl ResponseCache {
    /// Cache backed by the in-process store.
    pub fn new(policy: &CachePolicy) -> Self {
        Self {
            policy: policy.clone(),
            store: CacheStore::in_memory(policy.capacity),
            normalizer: MessageNormalizer::new(),
        }
    }

    /// Cache backed by a durable rocksdb store.
    #[cfg(feature = "durable-cache")]
    pub fn durable(
        policy: &CachePolicy,
        path: impl Into<std::path::PathBuf>,
    ) -> crate::error::StoreResult<Self> {
        Ok(Self {
            policy: policy.clone(),
            store: CacheStore::durable(path)?,
            normalizer: MessageNormalizer::new(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.policy.enabled
    }

    /// Derive the (key, normalized message) pair for a request.
    pub fn key_for(&self, message: &str, context: &Context, strategy: &str) -> (String, String) {
        let normalized = self.normalizer.normalize(message);
        let fingerprint = context_fingerprint(&self.policy.buckets, context);
        let key = cache_key(&normalized, &fingerprint, &self.policy.provider_id, strategy);
        (key, normalized)
    }

    /// Look up a response for the request, annotating hits with cache
    /// metadata and writing the hit count back. Expired entries are removed
    /// and reported as misses.
    pub async fn lookup(
        &self,
        message: &str,
        context: &Context,
        strategy: &str,
    ) -> Option<CoordinatedResponse> {
        if !self.policy.enabled {
            return None;
        }

        let (key, _) = self.key_for(message, context, strategy);
        let entry = match self.store.get(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Cache read failed; treating as miss");
                return None;
            }
        };

        if entry.is_expired(chrono::Utc::now()) {
            debug!(key = %key, "Cache entry expired; removing");
            if let Err(e) = self.store.delete(&key).await {
                warn!(error = %e, "Failed to remove expired cache entry");
            }
            return None;
        }

        // The bump happens inside the store so concurrent hits on one key
        // cannot lose increments.
        let served = match self.store.increment_hits(&key).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to write back cache hit count");
                entry
            }
        };

        let hit_count = served.hit_count;
        let written_at = served.created_at;
        let mut response = served.response;
        response.cache = Some(CacheInfo {
            hit: true,
            hit_count,
            written_at,
        });
        debug!(key = %key, hit_count, "Cache hit");
        Some(response)
    }

    /// Store a response if the write policy admits it. TTL scales with
    /// confidence and is clamped for freshness-sensitive messages.
    pub async fn record(
        &self,
        message: &str,
        context: &Context,
        strategy: &str,
        response: &CoordinatedResponse,
    ) {
        if !self.policy.enabled {
            return;
        }
        if response.fallback && !self.policy.mode.caches_fallbacks() {
            debug!("Skipping cache write for fallback response");
            return;
        }
        if response.confidence < self.policy.mode.min_write_confidence() {
            debug!(
                confidence = response.confidence,
                "Skipping cache write below confidence bar"
            );
            return;
        }

        let (key, normalized) = self.key_for(message, context, strategy);
        let freshness_sensitive = self.policy.is_freshness_sensitive(&message.to_lowercase());
        let ttl = self.policy.ttl_for(response.confidence, freshness_sensitive);

        // The stored copy carries no hit annotation; that is added per read.
        let mut stored = response.clone();
        stored.cache = None;

        let entry = CacheEntry::new(key.clone(), normalized, stored);
        match self.store.set(entry, ttl).await {
            Ok(()) => debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache write"),
            Err(e) => warn!(error = %e, "Cache write failed"),
        }
    }

    /// Remove entries whose normalized message contains the (case-folded)
    /// pattern, or all entries when `None`. Returns how many were removed.
    pub async fn clear(&self, pattern: Option<&str>) -> usize {
        let folded = pattern.map(|p| p.to_lowercase());
        match self.store.clear_matching(folded.as_deref()).await {
            Ok(count) => {
                debug!(count, "Cache cleared");
                count
            }
            Err(e) => {
                warn!(error = %e, "Cache clear failed");
                0
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.store.len().await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheMode;
    use crate::types::ResponderAnswer;
    use serde_json::json;

    fn response(confidence: f64) -> CoordinatedResponse {
        let answer = ResponderAnswer::new("fin", "financial", "Cut costs.", confidence);
        let mut response = CoordinatedResponse::from_primary(answer);
        response.confidence = confidence;
        response
    }

    fn context(revenue: i64) -> Context {
        let mut ctx = Context::new();
        ctx.insert("revenue".to_string(), json!(revenue));
        ctx
    }

    #[tokio::test]
    async fn test_miss_then_hit_with_metadata() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);

        assert!(cache.lookup("grow revenue", &ctx, "parallel").await.is_none());
        cache.record("grow revenue", &ctx, "parallel", &response(0.9)).await;

        let hit = cache.lookup("grow revenue", &ctx, "parallel").await.unwrap();
        let info = hit.cache.unwrap();
        assert!(info.hit);
        assert_eq!(info.hit_count, 1);

        let again = cache.lookup("grow revenue", &ctx, "parallel").await.unwrap();
        assert_eq!(again.cache.unwrap().hit_count, 2);
    }

    #[tokio::test]
    async fn test_rephrased_message_shares_entry() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);

        cache
            .record("How can I increase my revenue?", &ctx, "parallel", &response(0.9))
            .await;
        let hit = cache
            .lookup("Please, can you increase my REVENUE?", &ctx, "parallel")
            .await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_different_context_band_misses() {
        let cache = ResponseCache::new(&CachePolicy::default());
        cache
            .record("grow revenue", &context(5_000), "parallel", &response(0.9))
            .await;

        // 5k is "low", 500k is "high": different fingerprint, different key.
        assert!(cache
            .lookup("grow revenue", &context(500_000), "parallel")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_strategy_is_part_of_the_key() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);
        cache.record("grow revenue", &ctx, "parallel", &response(0.9)).await;

        assert!(cache.lookup("grow revenue", &ctx, "sequential").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed_on_read() {
        let policy = CachePolicy {
            base_ttl_secs: 0,
            ..CachePolicy::default()
        };
        let cache = ResponseCache::new(&policy);
        let ctx = context(50_000);

        cache.record("grow revenue", &ctx, "parallel", &response(0.9)).await;
        assert!(cache.lookup("grow revenue", &ctx, "parallel").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_low_confidence_not_written_in_balanced_mode() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);

        cache.record("grow revenue", &ctx, "parallel", &response(0.4)).await;
        assert!(cache.lookup("grow revenue", &ctx, "parallel").await.is_none());
    }

    #[tokio::test]
    async fn test_fallback_cached_only_in_aggressive_mode() {
        let ctx = context(50_000);
        let mut fallback = response(0.5);
        fallback.fallback = true;

        let balanced = ResponseCache::new(&CachePolicy::default());
        balanced.record("hello there", &ctx, "sequential", &fallback).await;
        assert!(balanced.lookup("hello there", &ctx, "sequential").await.is_none());

        let aggressive = ResponseCache::new(&CachePolicy {
            mode: CacheMode::Aggressive,
            ..CachePolicy::default()
        });
        aggressive.record("hello there", &ctx, "sequential", &fallback).await;
        assert!(aggressive.lookup("hello there", &ctx, "sequential").await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() {
        let cache = ResponseCache::new(&CachePolicy {
            enabled: false,
            ..CachePolicy::default()
        });
        let ctx = context(50_000);

        cache.record("grow revenue", &ctx, "parallel", &response(0.9)).await;
        assert!(cache.lookup("grow revenue", &ctx, "parallel").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_by_pattern() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);

        cache.record("grow revenue fast", &ctx, "parallel", &response(0.9)).await;
        cache.record("reduce operating costs", &ctx, "parallel", &response(0.9)).await;

        assert_eq!(cache.clear(Some("Revenue")).await, 1);
        assert!(cache.lookup("grow revenue fast", &ctx, "parallel").await.is_none());
        assert!(cache
            .lookup("reduce operating costs", &ctx, "parallel")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_stored_response_carries_no_stale_annotation() {
        let cache = ResponseCache::new(&CachePolicy::default());
        let ctx = context(50_000);

        let mut annotated = response(0.9);
        annotated.cache = Some(crate::types::CacheInfo {
            hit: true,
            hit_count: 99,
            written_at: chrono::Utc::now(),
        });
        cache.record("grow revenue", &ctx, "parallel", &annotated).await;

        let hit = cache.lookup("grow revenue", &ctx, "parallel").await.unwrap();
        assert_eq!(hit.cache.unwrap().hit_count, 1);
    }
}
