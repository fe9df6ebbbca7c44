//! Companies and the principal ↔ company ownership edge.

pub mod memory;
pub mod queries;
pub mod store;

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::credentials::validate_name;
use crate::auth::ownership::OwnershipResolver;
use crate::auth::store::PrincipalStore;
use crate::auth::{AuthError, AuthResult};
use crate::models::auth::Principal;
use crate::models::company::{Company, CompanyQuery};
use store::CompanyStore;

fn company_not_found() -> AuthError {
    AuthError::NotFound("Company not found".into())
}

/// Company operations. Role checks happen before these are called.
pub struct CompanyService {
    companies: Arc<dyn CompanyStore>,
    principals: Arc<dyn PrincipalStore>,
    ownership: Arc<OwnershipResolver>,
}

impl CompanyService {
    pub fn new(
        companies: Arc<dyn CompanyStore>,
        principals: Arc<dyn PrincipalStore>,
        ownership: Arc<OwnershipResolver>,
    ) -> Self {
        Self {
            companies,
            principals,
            ownership,
        }
    }

    pub async fn create(&self, name: &str) -> AuthResult<Company> {
        validate_name(name)?;
        let company = self.companies.insert(name.trim()).await?;
        info!(uuid = %company.uuid, "company created");
        Ok(company)
    }

    pub async fn list(&self, query: &CompanyQuery) -> AuthResult<(Vec<Company>, i64)> {
        self.companies.list(query).await
    }

    /// Companies linked to `principal`.
    pub async fn my_companies(
        &self,
        principal: &Principal,
        query: &CompanyQuery,
    ) -> AuthResult<(Vec<Company>, i64)> {
        self.companies.list_for_principal(principal.id, query).await
    }

    pub async fn find(&self, uuid: Uuid) -> AuthResult<Company> {
        self.companies
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(company_not_found)
    }

    pub async fn update(&self, uuid: Uuid, name: &str) -> AuthResult<Company> {
        validate_name(name)?;
        self.companies
            .update_name(uuid, name.trim())
            .await?
            .ok_or_else(company_not_found)
    }

    pub async fn delete(&self, uuid: Uuid) -> AuthResult<()> {
        if !self.companies.delete_by_uuid(uuid).await? {
            return Err(company_not_found());
        }
        self.ownership.invalidate_company(uuid).await;
        info!(%uuid, "company deleted");
        Ok(())
    }

    /// Link a principal to a company, creating the ownership edge.
    pub async fn link_user(&self, company_uuid: Uuid, user_uuid: Uuid) -> AuthResult<Company> {
        let company = self.find(company_uuid).await?;
        let principal = self
            .principals
            .find_by_uuid(user_uuid)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))?;

        self.companies
            .link_principal(principal.id, company.id)
            .await?;
        self.ownership.invalidate_principal(principal.id).await;
        info!(company = %company.uuid, user = %principal.uuid, "user linked to company");
        Ok(company)
    }
}
