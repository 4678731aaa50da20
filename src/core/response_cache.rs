//! Deterministic response cache.
//!
//! Keys are SHA-256 digests of a normalised `(role, tier, context, history)`
//! tuple — hash the canonical bytes rather than comparing structs directly.
//! Storage is an in-memory `Mutex<HashMap>` guarded the same way as
//! [`crate::core::metrics::MetricsCollector`]; a real deployment can swap
//! this for a Redis-backed implementation behind the same [`ResponseCache`]
//! API without touching callers.

use crate::core::types::{AgentRole, CacheKey, CachedResponse, ModelTier, ResponseMetadata};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Compute the deterministic [`CacheKey`] for a would-be agent call.
///
/// `context_fingerprint` and `history_fingerprint` are caller-supplied
/// normalised strings (stable ordering, no timestamps) — see
/// [`crate::core::context_builder::ContextBuilder`] for how they're derived.
pub fn compute_cache_key(
    role: AgentRole,
    tier: ModelTier,
    query: &str,
    context_fingerprint: &str,
    history_fingerprint: &str,
) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(role.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(format!("{:?}", tier).as_bytes());
    hasher.update(b"|");
    hasher.update(query.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(context_fingerprint.as_bytes());
    hasher.update(b"|");
    hasher.update(history_fingerprint.as_bytes());
    let digest = hasher.finalize();
    CacheKey(format!("{:x}", digest))
}

/// In-memory TTL-respecting response cache.
pub struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, CachedResponse>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        ResponseCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return a live entry for `key`, evicting it in place if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_live(Utc::now()) => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(
        &self,
        key: CacheKey,
        role: AgentRole,
        content: String,
        metadata: ResponseMetadata,
        ttl_seconds: u64,
    ) {
        let entry = CachedResponse {
            key: key.clone(),
            role,
            content,
            metadata,
            stored_at: Utc::now(),
            ttl_seconds,
        };
        self.entries.lock().unwrap().insert(key, entry);
    }

    /// Remove every entry. Exposed for tests and administrative tooling.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_key() {
        let a = compute_cache_key(AgentRole::Research, ModelTier::Fast, "hello", "ctx", "hist");
        let b = compute_cache_key(AgentRole::Research, ModelTier::Fast, "hello", "ctx", "hist");
        assert_eq!(a, b);
    }

    #[test]
    fn different_role_produces_different_key() {
        let a = compute_cache_key(AgentRole::Research, ModelTier::Fast, "hello", "ctx", "hist");
        let b = compute_cache_key(AgentRole::Analysis, ModelTier::Fast, "hello", "ctx", "hist");
        assert_ne!(a, b);
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = ResponseCache::new();
        let key = compute_cache_key(AgentRole::Summary, ModelTier::Standard, "q", "c", "h");
        cache.set(
            key.clone(),
            AgentRole::Summary,
            "cached".into(),
            ResponseMetadata::default(),
            0,
        );
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn live_entry_round_trips() {
        let cache = ResponseCache::new();
        let key = compute_cache_key(AgentRole::Summary, ModelTier::Standard, "q", "c", "h");
        cache.set(
            key.clone(),
            AgentRole::Summary,
            "cached".into(),
            ResponseMetadata::default(),
            60,
        );
        let hit = cache.get(&key).expect("entry should still be live");
        assert_eq!(hit.content, "cached");
    }
}
