use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Best-effort TTL cache for upstream responses.
///
/// Entries become stale after `ttl` and are then treated as absent; they are
/// not actively evicted. Only successful payloads should be stored so that
/// failures and not-found outcomes keep retrying upstream.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

/// Deterministic cache key from a logical endpoint name and its parameters.
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let serialized = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}:{}", endpoint, serialized)
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: &str, payload: Value) {
        self.set_at(key, payload, Instant::now());
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        if now.duration_since(entry.stored_at) < self.ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    fn set_at(&self, key: &str, payload: Value, now: Instant) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_after_set_returns_payload() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.set("k", json!({"value": 1}));
        assert_eq!(cache.get("k"), Some(json!({"value": 1})));
    }

    #[test]
    fn stale_entry_is_a_miss() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let now = Instant::now();
        cache.set_at("k", json!("payload"), now);

        assert_eq!(
            cache.get_at("k", now + Duration::from_secs(299)),
            Some(json!("payload"))
        );
        assert_eq!(cache.get_at("k", now + Duration::from_secs(300)), None);
    }

    #[test]
    fn unknown_key_is_a_miss() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn keys_are_deterministic_and_distinct() {
        let a = cache_key("lastfm-tracks", &[("username", "rj"), ("period", "1month")]);
        let b = cache_key("lastfm-tracks", &[("username", "rj"), ("period", "1month")]);
        let c = cache_key("lastfm-tracks", &[("username", "rj"), ("period", "7day")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
