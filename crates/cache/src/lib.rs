//! Tag-aware response cache.
//!
//! Values live in a Moka cache (bounded, with TTL). Next to it a tag index
//! maps each tag to the set of keys stored under it, so one
//! [`TagAwareCache::invalidate_tags`] call drops every entry sharing a tag,
//! e.g. all cached pages of a listing.
//!
//! Every tag also carries a generation counter, bumped on invalidation. A
//! value computed while one of its tags was invalidated is handed back to
//! its caller but never stays cached.
//!
//! Concurrent misses on the same key each run the computation; the last
//! writer wins. Callers that need single-flight must coordinate themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! let cache: TagAwareCache<String> = TagAwareCache::new(1_000, Duration::from_secs(60));
//!
//! let body = cache
//!     .get_or_compute("books-1-3", &["books"], || async { render_page(1, 3).await })
//!     .await?;
//!
//! cache.invalidate_tags(&["books"]).await;
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use atlas_kernel::settings::CacheSettings;
use dashmap::DashMap;
use moka::future::Cache;

/// Cache whose entries can be invalidated in bulk by tag.
#[derive(Clone)]
pub struct TagAwareCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, V>,
    /// tag -> keys stored under it. Keys Moka already evicted are pruned
    /// whenever a new key joins the tag.
    tags: Arc<DashMap<String, HashSet<String>>>,
    /// tag -> number of times it was invalidated.
    generations: Arc<DashMap<String, u64>>,
}

impl<V> TagAwareCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            tags: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.max_capacity, Duration::from_secs(settings.ttl_secs))
    }

    /// Returns the cached value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await
    }

    /// Returns the cached value for `key`, or runs `compute`, stores its
    /// value under `key` and registers `key` under every tag in `tags`.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        tags: &[&str],
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(cache_key = key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(cache_key = key, "cache miss, computing value");
        let seen = self.generations(tags);
        let value = compute().await?;

        if self.generations(tags) != seen {
            tracing::debug!(cache_key = key, "tag invalidated during computation, not caching");
            return Ok(value);
        }

        // Insert before registering so an invalidation can never miss a
        // stored key, then re-check for one that slipped in between.
        self.entries.insert(key.to_string(), value.clone()).await;
        self.register(key, tags);

        if self.generations(tags) != seen {
            self.entries.invalidate(key).await;
            for tag in tags {
                if let Some(mut keys) = self.tags.get_mut(*tag) {
                    keys.remove(key);
                }
            }
            tracing::debug!(cache_key = key, "tag invalidated during insert, entry dropped");
        }

        Ok(value)
    }

    fn generations(&self, tags: &[&str]) -> Vec<u64> {
        tags.iter()
            .map(|tag| self.generations.get(*tag).map_or(0, |generation| *generation))
            .collect()
    }

    fn register(&self, key: &str, tags: &[&str]) {
        for tag in tags {
            let mut keys = self.tags.entry((*tag).to_string()).or_default();
            keys.retain(|member| member == key || self.entries.contains_key(member.as_str()));
            keys.insert(key.to_string());
        }
    }

    /// Removes every entry registered under any of `tags`.
    ///
    /// Returns how many keys were dropped from the tag index.
    pub async fn invalidate_tags(&self, tags: &[&str]) -> usize {
        let mut removed = 0;
        for tag in tags {
            *self.generations.entry((*tag).to_string()).or_insert(0) += 1;
            let Some((_, keys)) = self.tags.remove(*tag) else {
                continue;
            };
            for key in &keys {
                self.entries.invalidate(key.as_str()).await;
            }
            removed += keys.len();
        }

        tracing::debug!(?tags, keys = removed, "cache tags invalidated");
        removed
    }

    /// Keys currently registered under `tag`, sorted.
    pub fn tagged_keys(&self, tag: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .tags
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> TagAwareCache<String> {
        TagAwareCache::new(100, Duration::from_secs(60))
    }

    async fn counted(
        cache: &TagAwareCache<String>,
        key: &str,
        tags: &[&str],
        calls: &AtomicUsize,
    ) -> String {
        cache
            .get_or_compute(key, tags, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(format!("{key}#{n}"))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        let first = counted(&cache, "page-1", &["books"], &calls).await;
        let second = counted(&cache, "page-1", &["books"], &calls).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidating_a_tag_drops_every_member_key() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, "page-1", &["books"], &calls).await;
        counted(&cache, "page-2", &["books"], &calls).await;
        counted(&cache, "authors-1", &["authors"], &calls).await;
        assert_eq!(cache.tagged_keys("books"), vec!["page-1", "page-2"]);

        assert_eq!(cache.invalidate_tags(&["books"]).await, 2);

        assert!(cache.get("page-1").await.is_none());
        assert!(cache.get("page-2").await.is_none());
        assert!(cache.get("authors-1").await.is_some());
        assert!(cache.tagged_keys("books").is_empty());

        counted(&cache, "page-1", &["books"], &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn unknown_tag_is_a_no_op() {
        let cache = cache();
        assert_eq!(cache.invalidate_tags(&["nothing"]).await, 0);
    }

    #[tokio::test]
    async fn failed_computation_is_not_cached() {
        let cache = cache();

        let err = cache
            .get_or_compute("page-1", &["books"], || async { Err::<String, _>("store down") })
            .await
            .unwrap_err();
        assert_eq!(err, "store down");
        assert!(cache.get("page-1").await.is_none());
        assert!(cache.tagged_keys("books").is_empty());
    }

    #[tokio::test]
    async fn invalidation_during_computation_is_not_cached() {
        let cache = cache();
        let racing = cache.clone();

        let value = cache
            .get_or_compute("page-1", &["books"], || async move {
                racing.invalidate_tags(&["books"]).await;
                Ok::<_, Infallible>("stale page".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "stale page");
        assert!(cache.get("page-1").await.is_none());
        assert!(cache.tagged_keys("books").is_empty());

        let calls = AtomicUsize::new(0);
        counted(&cache, "page-1", &["books"], &calls).await;
        assert!(cache.get("page-1").await.is_some());
        assert_eq!(cache.tagged_keys("books"), vec!["page-1"]);
    }

    #[tokio::test]
    async fn tag_index_only_tracks_live_keys() {
        let cache = TagAwareCache::new(10, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for page in 0..5_000 {
            counted(&cache, &format!("page-{page}"), &["books"], &calls).await;
        }
        cache.entries.run_pending_tasks().await;
        counted(&cache, "page-last", &["books"], &calls).await;

        let indexed = cache.tagged_keys("books").len();
        assert!(indexed <= 11, "tag index holds {indexed} keys");
        assert!(cache.tagged_keys("books").contains(&"page-last".to_string()));
    }
}
