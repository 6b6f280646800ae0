//! Endpoint-level response cache for conditional requests.
//!
//! Maps `endpoint -> last-modified marker` so the remote client can ask the
//! source to reply "unchanged". Entries are written only after a real 200
//! response carrying a `Last-Modified` header; a 304 leaves the entry as-is.

use std::collections::HashMap;
use std::sync::RwLock;

/// Key/value store of last-modified markers keyed by endpoint path.
///
/// Implementations must tolerate concurrent idempotent writes; whichever
/// marker lands last wins, which is safe because markers only move forward.
pub trait ResponseCache: Send + Sync {
    fn get(&self, endpoint: &str) -> Option<String>;
    fn put(&self, endpoint: &str, marker: &str);
}

/// In-process cache. A deployment backing the cache with a document store
/// collection implements [`ResponseCache`] over that collection instead.
#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryResponseCache {
    pub fn new() -> MemoryResponseCache {
        MemoryResponseCache::default()
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, endpoint: &str) -> Option<String> {
        self.entries.read().expect("cache lock poisoned").get(endpoint).cloned()
    }

    fn put(&self, endpoint: &str, marker: &str) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(endpoint.to_string(), marker.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let cache = MemoryResponseCache::new();
        assert_eq!(cache.get("events/2020"), None);
        cache.put("events/2020", "Wed, 01 Jan 2020 00:00:00 GMT");
        assert_eq!(cache.get("events/2020").as_deref(), Some("Wed, 01 Jan 2020 00:00:00 GMT"));

        cache.put("events/2020", "Thu, 02 Jan 2020 00:00:00 GMT");
        assert_eq!(cache.get("events/2020").as_deref(), Some("Thu, 02 Jan 2020 00:00:00 GMT"));
    }
}
