//! Company repository interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::models::company::{Company, CompanyQuery};

/// Storage for companies and the principal ↔ company ownership edges.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn insert(&self, name: &str) -> AuthResult<Company>;

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Company>>;

    /// Paginated listing with substring match on name.
    async fn list(&self, query: &CompanyQuery) -> AuthResult<(Vec<Company>, i64)>;

    /// Same as [`CompanyStore::list`], restricted to companies linked to `principal_id`.
    async fn list_for_principal(
        &self,
        principal_id: i64,
        query: &CompanyQuery,
    ) -> AuthResult<(Vec<Company>, i64)>;

    async fn update_name(&self, uuid: Uuid, name: &str) -> AuthResult<Option<Company>>;

    /// Delete a company together with its ownership edges.
    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool>;

    /// Create the ownership edge. Linking twice is a no-op.
    async fn link_principal(&self, principal_id: i64, company_id: i64) -> AuthResult<()>;

    /// Single indexed lookup on the ownership edge.
    async fn is_linked(&self, principal_id: i64, company_uuid: Uuid) -> AuthResult<bool>;
}
