//! In-memory company store.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::CompanyStore;
use crate::auth::AuthResult;
use crate::models::company::{Company, CompanyQuery};
use crate::pagination::{Pagination, contains_ci};

#[derive(Default)]
struct State {
    companies: BTreeMap<i64, Company>,
    /// `(principal_id, company_id)` ownership edges.
    edges: BTreeSet<(i64, i64)>,
    next_id: i64,
}

#[derive(Default)]
pub struct InMemoryCompanyStore {
    state: RwLock<State>,
}

impl InMemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page_of<'a>(
    companies: impl Iterator<Item = &'a Company>,
    query: &CompanyQuery,
) -> (Vec<Company>, i64) {
    let mut matching: Vec<Company> = companies
        .filter(|c| query.name.as_deref().is_none_or(|n| contains_ci(&c.name, n)))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    let total = matching.len() as i64;
    (Pagination::new(query.page, query.limit).apply(matching), total)
}

#[async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn insert(&self, name: &str) -> AuthResult<Company> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();
        let company = Company {
            id: state.next_id,
            uuid: Uuid::now_v7(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Company>> {
        let state = self.state.read().await;
        Ok(state.companies.values().find(|c| c.uuid == uuid).cloned())
    }

    async fn list(&self, query: &CompanyQuery) -> AuthResult<(Vec<Company>, i64)> {
        let state = self.state.read().await;
        Ok(page_of(state.companies.values(), query))
    }

    async fn list_for_principal(
        &self,
        principal_id: i64,
        query: &CompanyQuery,
    ) -> AuthResult<(Vec<Company>, i64)> {
        let state = self.state.read().await;
        let owned = state
            .companies
            .values()
            .filter(|c| state.edges.contains(&(principal_id, c.id)));
        Ok(page_of(owned, query))
    }

    async fn update_name(&self, uuid: Uuid, name: &str) -> AuthResult<Option<Company>> {
        let mut state = self.state.write().await;
        Ok(state
            .companies
            .values_mut()
            .find(|c| c.uuid == uuid)
            .map(|c| {
                c.name = name.to_string();
                c.updated_at = Utc::now();
                c.clone()
            }))
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        let mut state = self.state.write().await;
        let Some(id) = state
            .companies
            .values()
            .find(|c| c.uuid == uuid)
            .map(|c| c.id)
        else {
            return Ok(false);
        };
        state.companies.remove(&id);
        state.edges.retain(|(_, company_id)| *company_id != id);
        Ok(true)
    }

    async fn link_principal(&self, principal_id: i64, company_id: i64) -> AuthResult<()> {
        self.state
            .write()
            .await
            .edges
            .insert((principal_id, company_id));
        Ok(())
    }

    async fn is_linked(&self, principal_id: i64, company_uuid: Uuid) -> AuthResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .companies
            .values()
            .find(|c| c.uuid == company_uuid)
            .is_some_and(|c| state.edges.contains(&(principal_id, c.id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_then_lookup() {
        let store = InMemoryCompanyStore::new();
        let acme = store.insert("Acme").await.unwrap();
        assert!(!store.is_linked(1, acme.uuid).await.unwrap());
        store.link_principal(1, acme.id).await.unwrap();
        store.link_principal(1, acme.id).await.unwrap();
        assert!(store.is_linked(1, acme.uuid).await.unwrap());
        assert!(!store.is_linked(2, acme.uuid).await.unwrap());
    }

    #[tokio::test]
    async fn delete_drops_edges() {
        let store = InMemoryCompanyStore::new();
        let acme = store.insert("Acme").await.unwrap();
        store.link_principal(1, acme.id).await.unwrap();
        assert!(store.delete_by_uuid(acme.uuid).await.unwrap());
        assert!(!store.delete_by_uuid(acme.uuid).await.unwrap());
        assert!(!store.is_linked(1, acme.uuid).await.unwrap());
    }

    #[tokio::test]
    async fn principal_listing_only_shows_linked_companies() {
        let store = InMemoryCompanyStore::new();
        let acme = store.insert("Acme").await.unwrap();
        store.insert("Globex").await.unwrap();
        let initech = store.insert("Initech").await.unwrap();
        store.link_principal(7, acme.id).await.unwrap();
        store.link_principal(7, initech.id).await.unwrap();

        let (mine, total) = store
            .list_for_principal(7, &CompanyQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        let names: Vec<_> = mine.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Acme", "Initech"]);

        let query = CompanyQuery {
            name: Some("tech".into()),
            ..Default::default()
        };
        let (all, total) = store.list(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(all[0].uuid, initech.uuid);
    }
    #[tokio::test]
    async fn name_search_treats_wildcards_literally() {
        let store = InMemoryCompanyStore::new();
        store.insert("Acme").await.unwrap();
        let promo = store.insert("50% Off Ltd").await.unwrap();

        for needle in ["%", "0%"] {
            let query = CompanyQuery {
                name: Some(needle.into()),
                ..Default::default()
            };
            let (found, total) = store.list(&query).await.unwrap();
            assert_eq!(total, 1, "{needle}");
            assert_eq!(found[0].uuid, promo.uuid);
        }
        let query = CompanyQuery {
            name: Some("_".into()),
            ..Default::default()
        };
        assert_eq!(store.list(&query).await.unwrap().1, 0);
    }
}
