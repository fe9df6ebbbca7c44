//! Ownership resolver with a short-TTL in-process cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::AuthResult;
use crate::companies::store::CompanyStore;

/// Default TTL for cached ownership answers: 30 seconds.
pub const DEFAULT_OWNERSHIP_TTL_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    owned: bool,
    expires_at: DateTime<Utc>,
}

/// Ownership answers keyed by `(principal_id, company_uuid)`.
///
/// `generation` advances on every invalidation. A store read started under an
/// older generation is not cached, so a link or delete that lands between the
/// read and the write cannot leave a stale answer behind.
#[derive(Debug)]
struct OwnershipCache {
    entries: HashMap<(i64, Uuid), CacheEntry>,
    ttl_ms: i64,
    generation: u64,
}

impl OwnershipCache {
    fn new(ttl_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms,
            generation: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.ttl_ms > 0
    }

    fn get(&self, principal_id: i64, company: Uuid) -> Option<bool> {
        self.entries
            .get(&(principal_id, company))
            .filter(|entry| Utc::now() < entry.expires_at)
            .map(|entry| entry.owned)
    }

    /// Store an answer read under `generation`. Expired entries are dropped
    /// on the way.
    fn set(&mut self, generation: u64, principal_id: i64, company: Uuid, owned: bool) {
        if !self.enabled() || generation != self.generation {
            return;
        }
        let now = Utc::now();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let expires_at = now + Duration::milliseconds(self.ttl_ms);
        self.entries
            .insert((principal_id, company), CacheEntry { owned, expires_at });
    }

    fn invalidate_principal(&mut self, principal_id: i64) {
        self.generation += 1;
        self.entries.retain(|(p, _), _| *p != principal_id);
    }

    fn invalidate_company(&mut self, company: Uuid) {
        self.generation += 1;
        self.entries.retain(|(_, c), _| *c != company);
    }
}

/// Answers "is principal P linked to company C".
///
/// Edges only change on link and delete events, and both invalidate the
/// affected entries, so the TTL only bounds staleness from other processes.
pub struct OwnershipResolver {
    companies: Arc<dyn CompanyStore>,
    cache: RwLock<OwnershipCache>,
}

impl OwnershipResolver {
    /// `ttl_ms <= 0` disables caching.
    pub fn new(companies: Arc<dyn CompanyStore>, ttl_ms: i64) -> Self {
        Self {
            companies,
            cache: RwLock::new(OwnershipCache::new(ttl_ms)),
        }
    }

    pub async fn is_owner(&self, principal_id: i64, company_uuid: Uuid) -> AuthResult<bool> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(owned) = cache.get(principal_id, company_uuid) {
                return Ok(owned);
            }
            cache.generation
        };

        let owned = self.companies.is_linked(principal_id, company_uuid).await?;
        debug!(principal_id, %company_uuid, owned, "ownership resolved");

        self.cache
            .write()
            .await
            .set(generation, principal_id, company_uuid, owned);
        Ok(owned)
    }

    pub async fn invalidate_principal(&self, principal_id: i64) {
        self.cache.write().await.invalidate_principal(principal_id);
    }

    pub async fn invalidate_company(&self, company_uuid: Uuid) {
        self.cache.write().await.invalidate_company(company_uuid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companies::memory::InMemoryCompanyStore;

    #[test]
    fn disabled_cache_stores_nothing() {
        let mut cache = OwnershipCache::new(0);
        cache.set(0, 1, Uuid::nil(), true);
        assert!(cache.entries.is_empty());
        assert!(cache.get(1, Uuid::nil()).is_none());
    }

    #[test]
    fn expired_entries_are_purged_on_insert() {
        let mut cache = OwnershipCache::new(60_000);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cache.entries.insert(
            (9, a),
            CacheEntry {
                owned: true,
                expires_at: Utc::now() - Duration::seconds(1),
            },
        );
        assert!(cache.get(9, a).is_none());

        cache.set(0, 1, b, true);
        assert!(!cache.entries.contains_key(&(9, a)));
        assert_eq!(cache.get(1, b), Some(true));
    }

    #[test]
    fn answer_read_before_invalidation_is_dropped() {
        let mut cache = OwnershipCache::new(60_000);
        let acme = Uuid::new_v4();
        let started = cache.generation;
        cache.invalidate_principal(1);

        cache.set(started, 1, acme, false);
        assert!(cache.get(1, acme).is_none());

        cache.set(cache.generation, 1, acme, true);
        assert_eq!(cache.get(1, acme), Some(true));
    }

    #[test]
    fn invalidation_is_scoped() {
        let mut cache = OwnershipCache::new(60_000);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cache.set(0, 1, a, true);
        cache.set(0, 2, a, false);
        cache.set(0, 1, b, true);
        cache.invalidate_principal(1);
        assert_eq!(cache.get(2, a), Some(false));
        assert!(cache.get(1, b).is_none());
        cache.invalidate_company(a);
        assert!(cache.get(2, a).is_none());
    }

    #[tokio::test]
    async fn cached_answer_survives_until_invalidated() {
        let store = Arc::new(InMemoryCompanyStore::new());
        let acme = store.insert("Acme").await.unwrap();
        let resolver = OwnershipResolver::new(store.clone(), 60_000);

        assert!(!resolver.is_owner(1, acme.uuid).await.unwrap());
        store.link_principal(1, acme.id).await.unwrap();
        // Still the cached negative answer.
        assert!(!resolver.is_owner(1, acme.uuid).await.unwrap());

        resolver.invalidate_principal(1).await;
        assert!(resolver.is_owner(1, acme.uuid).await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_always_reads_through() {
        let store = Arc::new(InMemoryCompanyStore::new());
        let acme = store.insert("Acme").await.unwrap();
        let resolver = OwnershipResolver::new(store.clone(), 0);

        assert!(!resolver.is_owner(1, acme.uuid).await.unwrap());
        store.link_principal(1, acme.id).await.unwrap();
        assert!(resolver.is_owner(1, acme.uuid).await.unwrap());
    }
}
