//! Explicit memoization for warehouse-backed responses.
//!
//! Handlers look results up here before querying the warehouse and store what
//! they computed afterwards. Three caches are kept:
//!
//! | Cache | Key | Expiry |
//! |-------|-----|--------|
//! | Responses | endpoint + every request input | TTL (default 1 h), byte-weighted |
//! | Pressure windows | installation, node, exact start and finish | never, entry-bounded |
//! | Sensor types | single entry | TTL |
//!
//! Every cache can be disabled; lookups then always miss and results are
//! identical, only slower.
//!
//! # Usage
//!
//! ```text
//! let key = cache::cache_key("sensors", &[&installation, node, &sensor, ...]);
//! if let Some(cached) = state.response_cache.get(&key).await {
//!     return cache::cached_response(cached, true);
//! }
//! // ... compute response ...
//! cache::cache_and_respond(&state.response_cache, key, &response).await
//! ```

use axum::{
    http::{header, HeaderValue},
    response::Response,
};
use chrono::NaiveDateTime;
use moka::future::Cache;
use serde::Serialize;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::pipeline::window::PressureWindow;
use crate::warehouse::SensorType;

/// Serialized response body plus its content type.
#[derive(Clone)]
pub struct CachedResponse {
    pub data: Arc<Vec<u8>>,
    pub content_type: &'static str,
}

/// Key of a fetched pressure buffer. Must match exactly to be reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PressureWindowKey {
    pub installation_reference: String,
    pub node_id: Option<String>,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

/// A moka cache that may be switched off.
#[derive(Clone)]
pub struct MemoCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Option<Cache<K, V>>,
}

pub type ResponseCache = MemoCache<String, CachedResponse>;
pub type PressureWindowCache = MemoCache<PressureWindowKey, Arc<PressureWindow>>;
pub type SensorTypeCache = MemoCache<(), Arc<Vec<SensorType>>>;

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }

    /// Return the cached value for `key`, or run `fetch` and remember its result.
    ///
    /// Errors are returned as-is and never cached.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetch` returns.
    pub async fn get_or_try_insert<F, Fut>(&self, key: K, fetch: F) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.as_ref().map_or(0, Cache::entry_count)
    }
}

impl ResponseCache {
    /// Byte-weighted response cache whose entries expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_key: &String, value: &CachedResponse| -> u32 {
                // Weight is the size in bytes (capped at u32::MAX)
                value.data.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { inner: Some(cache) }
    }

    /// Invalidate all entries whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let Some(cache) = &self.inner else {
            return;
        };
        let prefix_owned = prefix.to_string();
        if let Err(e) = cache.invalidate_entries_if(move |key, _| key.starts_with(&prefix_owned)) {
            tracing::warn!(prefix = %prefix, error = %e, "cache_prefix_invalidation_failed");
            return;
        }
        tracing::debug!(prefix = %prefix, "cache_prefix_invalidated");
    }
}

impl PressureWindowCache {
    /// Entry-bounded cache without expiry.
    #[must_use]
    pub fn unbounded_in_time(max_entries: u64) -> Self {
        Self {
            inner: Some(Cache::builder().max_capacity(max_entries).build()),
        }
    }
}

impl SensorTypeCache {
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Some(Cache::builder().max_capacity(1).time_to_live(ttl).build()),
        }
    }
}

/// Build a cache key from a prefix and components.
///
/// Components are joined with `:` separator. Empty components are included
/// to ensure different queries produce different keys. Backslashes and `:`
/// inside a component are backslash-escaped, so every unescaped `:` is a boundary.
pub fn cache_key(prefix: &str, components: &[&str]) -> String {
    let mut key = prefix.to_string();
    for c in components {
        key.push(':');
        for ch in c.chars() {
            if matches!(ch, ':' | '\\') {
                key.push('\\');
            }
            key.push(ch);
        }
    }
    key
}

/// Build a response with an X-Cache header indicating hit/miss status.
pub fn cached_response(cached: CachedResponse, cache_hit: bool) -> AppResult<Response> {
    let cache_header = if cache_hit { "HIT" } else { "MISS" };
    let data = Arc::try_unwrap(cached.data).unwrap_or_else(|shared| (*shared).clone());
    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static(cached.content_type))
        .header("X-Cache", HeaderValue::from_static(cache_header))
        .body(axum::body::Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Store an already-encoded body and return it as a cache miss.
pub async fn store_and_respond(
    cache: &ResponseCache,
    cache_key: String,
    data: Vec<u8>,
    content_type: &'static str,
) -> AppResult<Response> {
    let cached = CachedResponse {
        data: Arc::new(data),
        content_type,
    };
    let size = cached.data.len();
    cache.insert(cache_key.clone(), cached.clone()).await;

    tracing::debug!(cache_key = %cache_key, size_bytes = size, "cache_stored");

    cached_response(cached, false)
}

/// Serialize a response as JSON, store it, and return it.
pub async fn cache_and_respond<T: Serialize>(
    cache: &ResponseCache,
    cache_key: String,
    response: &T,
) -> AppResult<Response> {
    let json_bytes = serde_json::to_vec(response).map_err(|e| AppError::Internal(e.to_string()))?;
    store_and_respond(cache, cache_key, json_bytes, "application/json").await
}
