//! Unit tests for cache module.
//!
//! Run with: cargo test --test cache_unit_test

mod common;

use aerosense_dashboard::error::AppError;
use aerosense_dashboard::services::cache::{
    self, CachedResponse, PressureWindowCache, PressureWindowKey, ResponseCache,
};
use aerosense_dashboard::pipeline::{Dataset, PressureWindow, TimeWindow};
use common::ts;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn cache_key_builds_correctly() {
    // Basic key building
    assert_eq!(cache::cache_key("sensors", &[]), "sensors");
    assert_eq!(
        cache::cache_key("sensors", &["inst-1", "node-0", "barometer"]),
        "sensors:inst-1:node-0:barometer"
    );

    // Empty components preserved (ensures query uniqueness)
    assert_ne!(
        cache::cache_key("sensors", &["inst-1", "", "barometer"]),
        cache::cache_key("sensors", &["inst-1", "barometer"])
    );
}

#[test]
fn separators_inside_components_cannot_collide() {
    assert_ne!(
        cache::cache_key("sensors", &["a:b", ""]),
        cache::cache_key("sensors", &["a", "b"])
    );
    assert_eq!(cache::cache_key("sensors", &["a:b"]), "sensors:a\\:b");
    assert_ne!(
        cache::cache_key("sensors", &["a\\", "b"]),
        cache::cache_key("sensors", &["a\\:b"])
    );
}

#[tokio::test]
async fn prefix_invalidation_respects_escaped_separators() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(60), 1024 * 1024);
    let plain = cache::cache_key("sessions", &["inst", "", "barometer"]);
    let colon = cache::cache_key("sessions", &["inst:x", "", "barometer"]);
    cache.insert(plain.clone(), body("[]")).await;
    cache.insert(colon.clone(), body("[]")).await;

    cache.invalidate_prefix(&cache::cache_key("sessions", &["inst", ""]));

    assert!(cache.get(&plain).await.is_none());
    assert!(cache.get(&colon).await.is_some());
}

fn body(text: &str) -> CachedResponse {
    CachedResponse {
        data: Arc::new(text.as_bytes().to_vec()),
        content_type: "application/json",
    }
}

#[tokio::test]
async fn disabled_cache_never_stores() {
    let cache = ResponseCache::disabled();
    cache.insert("k".to_string(), body("{}")).await;
    assert!(cache.get(&"k".to_string()).await.is_none());
    assert_eq!(cache.entry_count(), 0);
}

#[tokio::test]
async fn prefix_invalidation_only_drops_matching_keys() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(60), 1024 * 1024);
    cache.insert("sessions:inst-1::barometer".to_string(), body("[1]")).await;
    cache.insert("sessions:inst-10::barometer".to_string(), body("[2]")).await;

    cache.invalidate_prefix(&cache::cache_key("sessions", &["inst-1", ""]));

    assert!(cache.get(&"sessions:inst-1::barometer".to_string()).await.is_none());
    assert!(cache.get(&"sessions:inst-10::barometer".to_string()).await.is_some());
}

#[tokio::test]
async fn cached_responses_report_hits() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(60), 1024 * 1024);
    let miss = cache::cache_and_respond(&cache, "installations".to_string(), &vec!["inst-1"])
        .await
        .expect("responds");
    assert_eq!(miss.headers()["X-Cache"], "MISS");

    let cached = cache.get(&"installations".to_string()).await.expect("stored");
    assert_eq!(cached.data.as_slice(), br#"["inst-1"]"#);
    let hit = cache::cached_response(cached, true).expect("responds");
    assert_eq!(hit.headers()["X-Cache"], "HIT");
    assert_eq!(hit.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn pressure_windows_are_fetched_once_per_exact_key() {
    let cache = PressureWindowCache::unbounded_in_time(16);
    let fetches = AtomicUsize::new(0);
    let start = ts("2024-01-01T00:00:00");
    let key = |finish_seconds: i64| PressureWindowKey {
        installation_reference: "inst-1".to_string(),
        node_id: None,
        start,
        finish: start + chrono::Duration::seconds(finish_seconds),
    };
    let fetch = |finish_seconds: i64| {
        fetches.fetch_add(1, Ordering::SeqCst);
        let span = TimeWindow::new(start, start + chrono::Duration::seconds(finish_seconds));
        async move { Ok(Arc::new(PressureWindow::new(span, Dataset::default()))) }
    };

    cache.get_or_try_insert(key(60), || fetch(60)).await.expect("fetches");
    cache.get_or_try_insert(key(60), || fetch(60)).await.expect("cached");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    cache.get_or_try_insert(key(61), || fetch(61)).await.expect("fetches");
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_fetches_are_not_cached() {
    let cache = PressureWindowCache::unbounded_in_time(16);
    let start = ts("2024-01-01T00:00:00");
    let key = PressureWindowKey {
        installation_reference: "inst-1".to_string(),
        node_id: Some("0".to_string()),
        start,
        finish: start + chrono::Duration::seconds(60),
    };

    let result = cache
        .get_or_try_insert(key.clone(), || async {
            Err(AppError::Warehouse("timeout".to_string()))
        })
        .await;
    assert!(result.is_err());
    assert!(cache.get(&key).await.is_none());
}
