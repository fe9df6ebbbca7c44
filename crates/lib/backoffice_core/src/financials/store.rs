//! Financial ledger repository interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::models::company::{Financial, FinancialDetail, FinancialQuery};

#[async_trait]
pub trait FinancialStore: Send + Sync {
    async fn insert(&self, company_uuid: Uuid, created_by: Uuid) -> AuthResult<Financial>;

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Financial>>;

    /// Paginated listing, newest first, optionally scoped to one company.
    async fn list(&self, query: &FinancialQuery) -> AuthResult<(Vec<Financial>, i64)>;

    /// Deletes the ledger and its line items.
    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool>;

    async fn insert_detail(
        &self,
        financial: &Financial,
        value_cents: i64,
    ) -> AuthResult<FinancialDetail>;

    /// Line items of `financial`, oldest first.
    async fn list_details(&self, financial: &Financial) -> AuthResult<Vec<FinancialDetail>>;
}
