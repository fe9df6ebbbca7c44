//! Service graph, built once at start-up and shared by handle.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AuthResult;
use crate::auth::credentials::CredentialStore;
use crate::auth::guard::AuthorizationGuard;
use crate::auth::jwt::{TokenService, TokenSettings};
use crate::auth::lifecycle::AccountLifecycle;
use crate::auth::memory::InMemoryPrincipalStore;
use crate::auth::ownership::{DEFAULT_OWNERSHIP_TTL_MS, OwnershipResolver};
use crate::auth::password::DEFAULT_BCRYPT_COST;
use crate::auth::queries::PgPrincipalStore;
use crate::auth::store::PrincipalStore;
use crate::companies::CompanyService;
use crate::companies::memory::InMemoryCompanyStore;
use crate::companies::queries::PgCompanyStore;
use crate::companies::store::CompanyStore;
use crate::financials::FinancialService;
use crate::financials::memory::InMemoryFinancialStore;
use crate::financials::queries::PgFinancialStore;
use crate::financials::store::FinancialStore;
use crate::notify::Notifier;
use crate::users::UserService;

/// Tunables for the service graph.
#[derive(Clone)]
pub struct ServiceSettings {
    pub tokens: TokenSettings,
    pub bcrypt_cost: u32,
    pub mail_from: String,
    pub ownership_ttl_ms: i64,
}

impl ServiceSettings {
    pub fn new(tokens: TokenSettings) -> Self {
        Self {
            tokens,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            mail_from: "noreply@backoffice.local".to_string(),
            ownership_ttl_ms: DEFAULT_OWNERSHIP_TTL_MS,
        }
    }
}

/// Repository handles.
#[derive(Clone)]
pub struct Stores {
    pub principals: Arc<dyn PrincipalStore>,
    pub companies: Arc<dyn CompanyStore>,
    pub financials: Arc<dyn FinancialStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            principals: Arc::new(PgPrincipalStore::new(pool.clone())),
            companies: Arc::new(PgCompanyStore::new(pool.clone())),
            financials: Arc::new(PgFinancialStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            principals: Arc::new(InMemoryPrincipalStore::new()),
            companies: Arc::new(InMemoryCompanyStore::new()),
            financials: Arc::new(InMemoryFinancialStore::new()),
        }
    }
}

/// All domain services.
pub struct Services {
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub lifecycle: Arc<AccountLifecycle>,
    pub ownership: Arc<OwnershipResolver>,
    pub guard: Arc<AuthorizationGuard>,
    pub users: Arc<UserService>,
    pub companies: Arc<CompanyService>,
    pub financials: Arc<FinancialService>,
}

impl Services {
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn Notifier>,
        settings: &ServiceSettings,
    ) -> AuthResult<Self> {
        let credentials = Arc::new(CredentialStore::new(
            stores.principals.clone(),
            settings.bcrypt_cost,
        )?);
        let tokens = Arc::new(TokenService::new(&settings.tokens));
        let lifecycle = Arc::new(AccountLifecycle::new(
            credentials.clone(),
            tokens.clone(),
            notifier,
            settings.mail_from.clone(),
        ));
        let ownership = Arc::new(OwnershipResolver::new(
            stores.companies.clone(),
            settings.ownership_ttl_ms,
        ));
        let guard = Arc::new(AuthorizationGuard::new(
            tokens.clone(),
            stores.principals.clone(),
            ownership.clone(),
        ));
        let users = Arc::new(UserService::new(stores.principals.clone(), lifecycle.clone()));
        let companies = Arc::new(CompanyService::new(
            stores.companies.clone(),
            stores.principals,
            ownership.clone(),
        ));
        let financials = Arc::new(FinancialService::new(
            stores.financials,
            stores.companies,
            guard.clone(),
        ));

        Ok(Self {
            credentials,
            tokens,
            lifecycle,
            ownership,
            guard,
            users,
            companies,
            financials,
        })
    }
}
