//! Financial ledgers scoped to a company.

pub mod memory;
pub mod queries;
pub mod store;

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::guard::AuthorizationGuard;
use crate::auth::{AuthError, AuthResult};
use crate::companies::store::CompanyStore;
use crate::models::auth::Principal;
use crate::models::company::{Financial, FinancialDetail, FinancialQuery, FinancialWithDetails};
use store::FinancialStore;

fn financial_not_found() -> AuthError {
    AuthError::NotFound("Financial not found".into())
}

pub struct FinancialService {
    financials: Arc<dyn FinancialStore>,
    companies: Arc<dyn CompanyStore>,
    guard: Arc<AuthorizationGuard>,
}

impl FinancialService {
    pub fn new(
        financials: Arc<dyn FinancialStore>,
        companies: Arc<dyn CompanyStore>,
        guard: Arc<AuthorizationGuard>,
    ) -> Self {
        Self {
            financials,
            companies,
            guard,
        }
    }

    /// Open a ledger for `company_uuid`. Requires ADMIN or ownership of the
    /// company. Non-owners get `Forbidden` whether or not the company exists.
    pub async fn create(&self, actor: &Principal, company_uuid: Uuid) -> AuthResult<Financial> {
        self.guard.require_owner(actor, company_uuid).await?;
        if self.companies.find_by_uuid(company_uuid).await?.is_none() {
            return Err(AuthError::NotFound("Company not found".into()));
        }
        let financial = self.financials.insert(company_uuid, actor.uuid).await?;
        info!(uuid = %financial.uuid, company = %company_uuid, "financial created");
        Ok(financial)
    }

    /// Load a ledger visible to `actor`: ADMIN, or owner of its company.
    async fn owned_financial(&self, actor: &Principal, uuid: Uuid) -> AuthResult<Financial> {
        let financial = self
            .financials
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(financial_not_found)?;
        self.guard
            .require_owner(actor, financial.company_uuid)
            .await?;
        Ok(financial)
    }

    /// A ledger with its line items.
    pub async fn find(&self, actor: &Principal, uuid: Uuid) -> AuthResult<FinancialWithDetails> {
        let financial = self.owned_financial(actor, uuid).await?;
        let details = self.financials.list_details(&financial).await?;
        Ok(FinancialWithDetails { financial, details })
    }

    /// Append a line item to a ledger.
    pub async fn add_detail(
        &self,
        actor: &Principal,
        financial_uuid: Uuid,
        value_cents: i64,
    ) -> AuthResult<FinancialDetail> {
        let financial = self.owned_financial(actor, financial_uuid).await?;
        let detail = self.financials.insert_detail(&financial, value_cents).await?;
        info!(uuid = %detail.uuid, financial = %financial.uuid, "financial detail added");
        Ok(detail)
    }

    pub async fn list(&self, query: &FinancialQuery) -> AuthResult<(Vec<Financial>, i64)> {
        self.financials.list(query).await
    }

    pub async fn delete(&self, uuid: Uuid) -> AuthResult<()> {
        if !self.financials.delete_by_uuid(uuid).await? {
            return Err(financial_not_found());
        }
        info!(%uuid, "financial deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenService, TokenSettings};
    use crate::auth::memory::InMemoryPrincipalStore;
    use crate::auth::ownership::OwnershipResolver;
    use crate::auth::store::PrincipalStore;
    use crate::companies::memory::InMemoryCompanyStore;
    use crate::models::auth::{NewPrincipal, Role};
    use memory::InMemoryFinancialStore;

    struct Fixture {
        service: FinancialService,
        principals: Arc<InMemoryPrincipalStore>,
        companies: Arc<InMemoryCompanyStore>,
    }

    fn fixture() -> Fixture {
        let tokens = Arc::new(TokenService::new(&TokenSettings::new("a", "r")));
        let principals = Arc::new(InMemoryPrincipalStore::new());
        let companies = Arc::new(InMemoryCompanyStore::new());
        let ownership = Arc::new(OwnershipResolver::new(companies.clone(), 0));
        let guard = Arc::new(AuthorizationGuard::new(tokens, principals.clone(), ownership));
        let service = FinancialService::new(
            Arc::new(InMemoryFinancialStore::new()),
            companies.clone(),
            guard,
        );
        Fixture {
            service,
            principals,
            companies,
        }
    }

    async fn principal(f: &Fixture, email: &str, role: Role) -> Principal {
        f.principals
            .insert(NewPrincipal {
                email: email.into(),
                name: "N".into(),
                password_hash: "h".into(),
                salt: "s".into(),
                role,
                confirmation_token: format!("t-{email}"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn owner_and_admin_create_stranger_is_forbidden() {
        let f = fixture();
        let owner = principal(&f, "o@x.com", Role::User).await;
        let stranger = principal(&f, "s@x.com", Role::User).await;
        let admin = principal(&f, "a@x.com", Role::Admin).await;
        let acme = f.companies.insert("Acme").await.unwrap();
        f.companies.link_principal(owner.id, acme.id).await.unwrap();

        let created = f.service.create(&owner, acme.uuid).await.unwrap();
        assert_eq!(created.created_by, owner.uuid);
        assert!(f.service.create(&admin, acme.uuid).await.is_ok());
        assert!(matches!(
            f.service.create(&stranger, acme.uuid).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));

        let (all, total) = f
            .service
            .list(&FinancialQuery {
                company: Some(acme.uuid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn admin_gets_not_found_for_missing_company() {
        let f = fixture();
        let admin = principal(&f, "a@x.com", Role::Admin).await;
        let stranger = principal(&f, "s@x.com", Role::User).await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            f.service.create(&admin, missing).await.unwrap_err(),
            AuthError::NotFound(_)
        ));
        assert!(matches!(
            f.service.create(&stranger, missing).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn details_are_gated_by_company_ownership() {
        let f = fixture();
        let owner = principal(&f, "o@x.com", Role::User).await;
        let stranger = principal(&f, "s@x.com", Role::User).await;
        let admin = principal(&f, "a@x.com", Role::Admin).await;
        let acme = f.companies.insert("Acme").await.unwrap();
        f.companies.link_principal(owner.id, acme.id).await.unwrap();
        let ledger = f.service.create(&owner, acme.uuid).await.unwrap();

        f.service.add_detail(&owner, ledger.uuid, 10_000).await.unwrap();
        f.service.add_detail(&admin, ledger.uuid, -2_500).await.unwrap();
        assert!(matches!(
            f.service.add_detail(&stranger, ledger.uuid, 1).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
        assert!(matches!(
            f.service.find(&stranger, ledger.uuid).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));

        let loaded = f.service.find(&owner, ledger.uuid).await.unwrap();
        assert_eq!(loaded.financial.uuid, ledger.uuid);
        let values: Vec<i64> = loaded.details.iter().map(|d| d.value_cents).collect();
        assert_eq!(values, vec![10_000, -2_500]);
        assert!(loaded.details.iter().all(|d| d.financial_uuid == ledger.uuid));

        assert!(matches!(
            f.service.add_detail(&admin, Uuid::new_v4(), 1).await.unwrap_err(),
            AuthError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let f = fixture();
        let admin = principal(&f, "a@x.com", Role::Admin).await;
        let acme = f.companies.insert("Acme").await.unwrap();
        let fin = f.service.create(&admin, acme.uuid).await.unwrap();
        f.service.delete(fin.uuid).await.unwrap();
        assert!(matches!(
            f.service.delete(fin.uuid).await.unwrap_err(),
            AuthError::NotFound(_)
        ));
    }
}
