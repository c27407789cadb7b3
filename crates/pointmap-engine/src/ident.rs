//! Identifier reconciliation between domain and engine identifier spaces.
//!
//! The engine accepts unsigned integers and UUIDs. Domain identifiers are
//! arbitrary JSON values; anything else is mapped to a deterministic
//! name-based UUID, so the same domain identifier always reaches the same
//! engine point without any lookup table. The session-lifetime [`IdCache`]
//! is therefore an optimization only — a miss re-derives.

use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::point::PointId;

/// Namespace for deterministic derivation.
pub const ID_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

/// Map a domain identifier into the engine identifier space.
///
/// 1. A string in canonical hyphenated UUID form passes through as a UUID.
/// 2. A non-negative integer passes through unchanged.
/// 3. Everything else derives a v5 UUID from its canonical string form.
pub fn reconcile(id: &Value) -> PointId {
    if let Value::String(s) = id {
        if s.len() == 36 {
            if let Ok(uuid) = Uuid::parse_str(s) {
                return PointId::Uuid(uuid);
            }
        }
    }
    if let Value::Number(n) = id {
        if let Some(u) = n.as_u64() {
            return PointId::Num(u);
        }
    }
    PointId::Uuid(Uuid::new_v5(&ID_NAMESPACE, canonical_string(id).as_bytes()))
}

/// The string form an identifier hashes and caches under. Strings are used
/// verbatim; other values use their JSON rendering.
pub fn canonical_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A fresh random domain identifier for records inserted without one.
pub fn random_domain_id() -> String {
    Uuid::new_v4().to_string()
}

/// Session-lifetime map `(collection, domain id) -> engine id`.
///
/// Recorded on every insert and consulted before lookups and deletes.
/// Because [`reconcile`] is deterministic the cache is never required for
/// correctness and may be dropped or bounded at any time.
#[derive(Debug, Default)]
pub struct IdCache {
    entries: HashMap<(String, String), PointId>,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, collection: &str, domain_id: &Value, engine_id: PointId) {
        self.entries
            .insert((collection.to_string(), canonical_string(domain_id)), engine_id);
    }

    pub fn lookup(&self, collection: &str, domain_id: &Value) -> Option<PointId> {
        self.entries
            .get(&(collection.to_string(), canonical_string(domain_id)))
            .copied()
    }

    /// Cached engine id, or a fresh derivation on miss.
    pub fn resolve(&self, collection: &str, domain_id: &Value) -> PointId {
        self.lookup(collection, domain_id)
            .unwrap_or_else(|| reconcile(domain_id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reconcile_is_deterministic() {
        let a = reconcile(&json!("doc1"));
        let b = reconcile(&json!("doc1"));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_inputs_yield_distinct_ids() {
        assert_ne!(reconcile(&json!("doc1")), reconcile(&json!("doc2")));
        assert_ne!(reconcile(&json!("1")), reconcile(&json!(-1)));
    }

    #[test]
    fn canonical_uuid_strings_pass_through() {
        let raw = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
        match reconcile(&json!(raw)) {
            PointId::Uuid(u) => assert_eq!(u.to_string(), raw),
            PointId::Num(_) => panic!("expected a uuid"),
        }
    }

    #[test]
    fn non_negative_integers_pass_through() {
        assert_eq!(reconcile(&json!(42)), PointId::Num(42));
        // Negative integers are rehashed, never errors.
        assert!(matches!(reconcile(&json!(-42)), PointId::Uuid(_)));
    }

    #[test]
    fn cache_miss_re_derives() {
        let cache = IdCache::new();
        assert_eq!(cache.resolve("docs", &json!("doc1")), reconcile(&json!("doc1")));
    }

    #[test]
    fn cache_hit_short_circuits() {
        let mut cache = IdCache::new();
        cache.record("docs", &json!("doc1"), PointId::Num(7));
        assert_eq!(cache.resolve("docs", &json!("doc1")), PointId::Num(7));
        // Other collections are unaffected.
        assert_eq!(cache.resolve("other", &json!("doc1")), reconcile(&json!("doc1")));
    }
}
