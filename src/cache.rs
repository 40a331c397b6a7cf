use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::pipeline::RecipeResult;
use crate::recipe::RecipeRequest;

/// Identical image bytes plus identical settings give the same recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub digest: String,
    pub request: RecipeRequest,
}

struct Entry {
    result: Arc<RecipeResult>,
    inserted: Instant,
}

struct Inner {
    by_id: LruCache<Uuid, Entry>,
    by_key: LruCache<CacheKey, Uuid>,
}

/// Finished results, addressable by id and by (image digest, request).
/// A zero TTL keeps entries until they are evicted.
pub struct ResultCache {
    inner: Mutex<Inner>,
    ttl: Option<Duration>,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                by_id: LruCache::new(capacity),
                by_key: LruCache::new(capacity),
            }),
            ttl: (config.ttl_seconds > 0).then(|| Duration::from_secs(config.ttl_seconds)),
        }
    }

    pub fn insert(&self, key: CacheKey, result: Arc<RecipeResult>) {
        self.insert_at(key, result, Instant::now());
    }

    /// Keeps a result reachable by id only, so lookups by image never return it.
    pub fn remember(&self, result: Arc<RecipeResult>) {
        let now = Instant::now();
        self.inner.lock().by_id.put(result.id, Entry { result, inserted: now });
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<RecipeResult>> {
        self.get_at(id, Instant::now())
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<RecipeResult>> {
        self.lookup_at(key, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&self, key: CacheKey, result: Arc<RecipeResult>, now: Instant) {
        let mut inner = self.inner.lock();
        inner.by_key.put(key, result.id);
        inner.by_id.put(result.id, Entry { result, inserted: now });
    }

    fn get_at(&self, id: &Uuid, now: Instant) -> Option<Arc<RecipeResult>> {
        let mut inner = self.inner.lock();
        let expired = match inner.by_id.get(id) {
            Some(entry) => self.is_expired(entry, now),
            None => return None,
        };
        if expired {
            inner.by_id.pop(id);
            return None;
        }
        inner.by_id.get(id).map(|e| Arc::clone(&e.result))
    }

    fn lookup_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<RecipeResult>> {
        let id = *self.inner.lock().by_key.get(key)?;
        let result = self.get_at(&id, now);
        if result.is_none() {
            self.inner.lock().by_key.pop(key);
        }
        result
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.ttl
            .map(|ttl| now.saturating_duration_since(entry.inserted) >= ttl)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::estimate_nutrition;
    use crate::intake::ImageSummary;
    use crate::models::Prediction;

    fn result() -> Arc<RecipeResult> {
        Arc::new(RecipeResult {
            id: Uuid::new_v4(),
            dish: "pizza".to_string(),
            image: ImageSummary {
                width: 100,
                height: 100,
                mime_type: "image/png".to_string(),
                size_bytes: 2048,
            },
            caption: "a pizza on a plate".to_string(),
            predictions: vec![Prediction::new("pizza", 0.9)],
            recipe: "Ingredients: dough".to_string(),
            nutrition: Some(estimate_nutrition("pizza")),
            request: RecipeRequest::default(),
            warnings: Vec::new(),
            created_at: chrono::Utc::now(),
        })
    }

    fn key(digest: &str) -> CacheKey {
        CacheKey {
            digest: digest.to_string(),
            request: RecipeRequest::default(),
        }
    }

    #[test]
    fn test_lookup_by_id_and_key() {
        let cache = ResultCache::new(&CacheConfig::default());
        let result = result();
        cache.insert(key("abc"), Arc::clone(&result));

        assert_eq!(cache.get(&result.id).unwrap().dish, "pizza");
        assert_eq!(cache.lookup(&key("abc")).unwrap().id, result.id);
        assert!(cache.lookup(&key("def")).is_none());
    }

    #[test]
    fn test_remembered_result_not_found_by_key() {
        let cache = ResultCache::new(&CacheConfig::default());
        let result = result();
        cache.remember(Arc::clone(&result));

        assert!(cache.get(&result.id).is_some());
        assert!(cache.lookup(&key("abc")).is_none());
    }

    #[test]
    fn test_different_request_misses() {
        let cache = ResultCache::new(&CacheConfig::default());
        cache.insert(key("abc"), result());

        let other = CacheKey {
            digest: "abc".to_string(),
            request: RecipeRequest {
                servings: 2,
                ..RecipeRequest::default()
            },
        };
        assert!(cache.lookup(&other).is_none());
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = ResultCache::new(&CacheConfig {
            ttl_seconds: 60,
            capacity: 8,
        });
        let result = result();
        let start = Instant::now();
        cache.insert_at(key("abc"), Arc::clone(&result), start);

        assert!(cache.get_at(&result.id, start + Duration::from_secs(59)).is_some());
        assert!(cache.lookup_at(&key("abc"), start + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache = ResultCache::new(&CacheConfig {
            ttl_seconds: 0,
            capacity: 2,
        });
        let first = result();
        cache.insert(key("a"), Arc::clone(&first));
        cache.insert(key("b"), result());
        cache.insert(key("c"), result());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&first.id).is_none());
    }
}
