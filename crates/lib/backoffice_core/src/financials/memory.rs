//! In-memory financial store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::FinancialStore;
use crate::auth::{AuthError, AuthResult};
use crate::models::company::{Financial, FinancialDetail, FinancialQuery};
use crate::pagination::Pagination;

#[derive(Default)]
struct State {
    financials: BTreeMap<i64, Financial>,
    /// Line items keyed by their own id, tagged with the parent ledger id.
    details: BTreeMap<i64, (i64, FinancialDetail)>,
    next_id: i64,
    next_detail_id: i64,
}

#[derive(Default)]
pub struct InMemoryFinancialStore {
    state: RwLock<State>,
}

impl InMemoryFinancialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FinancialStore for InMemoryFinancialStore {
    async fn insert(&self, company_uuid: Uuid, created_by: Uuid) -> AuthResult<Financial> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let financial = Financial {
            id: state.next_id,
            uuid: Uuid::now_v7(),
            company_uuid,
            created_by,
            created_at: Utc::now(),
        };
        state.financials.insert(financial.id, financial.clone());
        Ok(financial)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Financial>> {
        let state = self.state.read().await;
        Ok(state.financials.values().find(|f| f.uuid == uuid).cloned())
    }

    async fn list(&self, query: &FinancialQuery) -> AuthResult<(Vec<Financial>, i64)> {
        let state = self.state.read().await;
        // Ids grow with insertion, so reverse id order is newest first.
        let matching: Vec<Financial> = state
            .financials
            .values()
            .rev()
            .filter(|f| query.company.is_none_or(|c| f.company_uuid == c))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok((Pagination::new(query.page, query.limit).apply(matching), total))
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        let mut state = self.state.write().await;
        let Some(id) = state
            .financials
            .values()
            .find(|f| f.uuid == uuid)
            .map(|f| f.id)
        else {
            return Ok(false);
        };
        state.financials.remove(&id);
        state.details.retain(|_, (parent, _)| *parent != id);
        Ok(true)
    }

    async fn insert_detail(
        &self,
        financial: &Financial,
        value_cents: i64,
    ) -> AuthResult<FinancialDetail> {
        let mut state = self.state.write().await;
        if !state.financials.contains_key(&financial.id) {
            return Err(AuthError::NotFound("Financial not found".into()));
        }
        state.next_detail_id += 1;
        let detail = FinancialDetail {
            id: state.next_detail_id,
            uuid: Uuid::now_v7(),
            financial_uuid: financial.uuid,
            value_cents,
            created_at: Utc::now(),
        };
        state
            .details
            .insert(detail.id, (financial.id, detail.clone()));
        Ok(detail)
    }

    async fn list_details(&self, financial: &Financial) -> AuthResult<Vec<FinancialDetail>> {
        let state = self.state.read().await;
        Ok(state
            .details
            .values()
            .filter(|(parent, _)| *parent == financial.id)
            .map(|(_, detail)| detail.clone())
            .collect())
    }
}
