//! Remote actor caching
//!
//! Caches fetched actor records to reduce remote requests. Entries are
//! volatile and cleared on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::models::Actor;
use crate::error::AppError;
use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, CACHE_SIZE};

const CACHE_NAME: &str = "actor";

/// Cached actor entry
#[derive(Debug, Clone)]
struct CachedActor {
    actor: Arc<Actor>,
    /// When this entry was cached
    cached_at: Instant,
    /// TTL for this entry
    ttl: Duration,
}

impl CachedActor {
    /// Check if this cache entry is still valid
    fn is_valid(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

/// Actor cache
///
/// Thread-safe cache for actor records, keyed by canonical actor URL.
/// Shared across requests; writes are idempotent per key, so overwriting an
/// entry with a fresher copy is always safe.
pub struct ActorCache {
    /// Cache storage: actor URL -> cached actor
    entries: Arc<RwLock<HashMap<String, CachedActor>>>,
    /// HTTP client for fetching actors
    http_client: Arc<reqwest::Client>,
    /// Default TTL for cached actors
    default_ttl: Duration,
}

impl ActorCache {
    /// Create new actor cache
    ///
    /// # Arguments
    /// * `http_client` - HTTP client for fetching actors
    /// * `default_ttl` - Default TTL for cached actors (default: 1 hour)
    pub fn new(http_client: Arc<reqwest::Client>, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            http_client,
            default_ttl: default_ttl.unwrap_or(Duration::from_secs(3600)),
        }
    }

    /// Get an actor, fetching and caching it on miss.
    ///
    /// Checks the cache first; on miss or expiry fetches the actor document,
    /// validates it, stores it, and returns it. Entries are not guaranteed
    /// fresh within the TTL.
    ///
    /// # Arguments
    /// * `actor_url` - Canonical actor URL
    ///
    /// # Errors
    /// Fetch failures surface as errors to the caller; they never invalidate
    /// an existing (expired) entry.
    pub async fn get_and_cache(&self, actor_url: &str) -> Result<Arc<Actor>, AppError> {
        // 1. Check cache (read lock)
        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(actor_url) {
                if cached.is_valid() {
                    tracing::debug!("Actor cache hit for {}", actor_url);
                    CACHE_HITS_TOTAL.with_label_values(&[CACHE_NAME]).inc();
                    return Ok(cached.actor.clone());
                }
                tracing::debug!("Actor cache expired for {}", actor_url);
            }
        }

        // 2. Cache miss or expired - fetch from remote
        tracing::debug!("Actor cache miss for {}, fetching...", actor_url);
        CACHE_MISSES_TOTAL.with_label_values(&[CACHE_NAME]).inc();
        let actor =
            crate::federation::fetch_and_parse_actor(actor_url, &self.http_client).await?;
        let actor = Arc::new(actor);

        // 3. Update cache (write lock)
        self.store(actor_url, actor.clone()).await;

        Ok(actor)
    }

    /// Get a cached actor without ever triggering a network fetch.
    pub async fn get_by_id(&self, actor_url: &str) -> Option<Arc<Actor>> {
        let entries = self.entries.read().await;
        let result = entries
            .get(actor_url)
            .filter(|cached| cached.is_valid())
            .map(|cached| cached.actor.clone());

        if result.is_some() {
            CACHE_HITS_TOTAL.with_label_values(&[CACHE_NAME]).inc();
        } else {
            CACHE_MISSES_TOTAL.with_label_values(&[CACHE_NAME]).inc();
        }

        result
    }

    /// Insert an actor directly, keyed by its own URL.
    pub async fn insert(&self, actor: Actor) {
        let key = actor.id.clone();
        self.store(&key, Arc::new(actor)).await;
    }

    async fn store(&self, key: &str, actor: Arc<Actor>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CachedActor {
                actor,
                cached_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );
        CACHE_SIZE
            .with_label_values(&[CACHE_NAME])
            .set(entries.len() as i64);
    }

    /// Invalidate a cached actor
    pub async fn invalidate(&self, actor_url: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(actor_url);
        tracing::debug!("Invalidated actor cache for {}", actor_url);
    }

    /// Clear all cached actors
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        tracing::debug!("Cleared all actor cache entries");
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let total = entries.len();
        let valid = entries.values().filter(|v| v.is_valid()).count();
        let expired = total - valid;

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: expired,
        }
    }

    /// Prune expired entries
    ///
    /// Should be called periodically to clean up expired entries.
    pub async fn prune_expired(&self) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, v| v.is_valid());
        let after = entries.len();
        let removed = before - after;

        if removed > 0 {
            tracing::info!("Pruned {} expired actor cache entries", removed);
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Number of valid (non-expired) entries
    pub valid_entries: usize,
    /// Number of expired entries
    pub expired_entries: usize,
}
