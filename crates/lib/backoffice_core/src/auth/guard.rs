//! Authorization guard: resolves the principal behind a bearer token and
//! enforces role, ownership and self-or-admin rules.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::jwt::TokenService;
use super::ownership::OwnershipResolver;
use super::store::PrincipalStore;
use super::{AuthError, AuthResult, TokenRejection};
use crate::models::auth::{Principal, ProfileUpdate, Role, TokenKind};

/// Access requirement attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No token needed.
    Public,
    /// Any existing principal, active or not. Only for reading one's own profile.
    Profile,
    /// An active principal.
    Authenticated,
    /// An active principal holding the role.
    Role(Role),
}

impl Access {
    pub fn requires_token(&self) -> bool {
        !matches!(self, Access::Public)
    }
}

pub struct AuthorizationGuard {
    tokens: Arc<TokenService>,
    principals: Arc<dyn PrincipalStore>,
    ownership: Arc<OwnershipResolver>,
}

fn forbidden(reason: &'static str) -> AuthError {
    warn!(reason, "access denied");
    AuthError::Forbidden("You are not allowed to access this resource".into())
}

impl AuthorizationGuard {
    pub fn new(
        tokens: Arc<TokenService>,
        principals: Arc<dyn PrincipalStore>,
        ownership: Arc<OwnershipResolver>,
    ) -> Self {
        Self {
            tokens,
            principals,
            ownership,
        }
    }

    /// Verify an access token and load the current principal record.
    ///
    /// Role and activation state come from the store, never from the token.
    pub async fn authenticate(&self, bearer: &str) -> AuthResult<Principal> {
        let verified = self
            .tokens
            .verify(bearer, TokenKind::Access)
            .map_err(|rejection| {
                warn!(reason = rejection.reason(), "access token rejected");
                AuthError::from(rejection)
            })?;

        match self.principals.find_by_uuid(verified.principal_uuid).await? {
            Some(principal) => Ok(principal),
            None => {
                let rejection = TokenRejection::UnknownPrincipal;
                warn!(reason = rejection.reason(), uuid = %verified.principal_uuid, "access token rejected");
                Err(rejection.into())
            }
        }
    }

    /// Resolve and check the principal for a route's access requirement.
    /// Returns `None` for public routes.
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        access: Access,
    ) -> AuthResult<Option<Principal>> {
        if !access.requires_token() {
            return Ok(None);
        }
        let Some(bearer) = bearer else {
            warn!(reason = TokenRejection::Missing.reason(), "access token rejected");
            return Err(TokenRejection::Missing.into());
        };
        let principal = self.authenticate(bearer).await?;

        match access {
            Access::Public | Access::Profile => {}
            Access::Authenticated => Self::require_active(&principal)?,
            Access::Role(role) => {
                Self::require_active(&principal)?;
                Self::require_role(&principal, role)?;
            }
        }
        Ok(Some(principal))
    }

    pub fn require_active(principal: &Principal) -> AuthResult<()> {
        if principal.is_active {
            Ok(())
        } else {
            Err(forbidden("inactive"))
        }
    }

    pub fn require_role(principal: &Principal, role: Role) -> AuthResult<()> {
        if principal.role == role {
            Ok(())
        } else {
            Err(forbidden("role"))
        }
    }

    pub fn require_self_or_admin(principal: &Principal, target: Uuid) -> AuthResult<()> {
        if principal.is_admin() || principal.uuid == target {
            Ok(())
        } else {
            Err(forbidden("not_self"))
        }
    }

    /// Admins pass; anyone else must be linked to the company.
    pub async fn require_owner(&self, principal: &Principal, company_uuid: Uuid) -> AuthResult<()> {
        if principal.is_admin() || self.ownership.is_owner(principal.id, company_uuid).await? {
            Ok(())
        } else {
            Err(forbidden("not_owner"))
        }
    }

    /// Rules for the generic profile update path.
    ///
    /// Non-admins may only edit themselves and never touch roles. Setting
    /// `is_active` on an inactive account needs an active ADMIN caller; an
    /// inactive caller never activates anything.
    pub fn check_profile_update(
        actor: &Principal,
        target: &Principal,
        update: &ProfileUpdate,
    ) -> AuthResult<()> {
        Self::require_self_or_admin(actor, target.uuid)?;
        if !actor.is_admin() && update.role.is_some() {
            return Err(forbidden("role_change"));
        }
        if update.is_active == Some(true) && !target.is_active {
            if !actor.is_active {
                return Err(AuthError::Validation(
                    "Inactive accounts cannot activate accounts".into(),
                ));
            }
            if !actor.is_admin() {
                return Err(forbidden("activation"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenSettings;
    use crate::auth::memory::InMemoryPrincipalStore;
    use crate::companies::memory::InMemoryCompanyStore;
    use crate::companies::store::CompanyStore;
    use crate::models::auth::NewPrincipal;

    struct Fixture {
        guard: AuthorizationGuard,
        tokens: Arc<TokenService>,
        principals: Arc<InMemoryPrincipalStore>,
        companies: Arc<InMemoryCompanyStore>,
    }

    fn fixture() -> Fixture {
        let tokens = Arc::new(TokenService::new(&TokenSettings::new("a", "r")));
        let principals = Arc::new(InMemoryPrincipalStore::new());
        let companies = Arc::new(InMemoryCompanyStore::new());
        let ownership = Arc::new(OwnershipResolver::new(companies.clone(), 0));
        let guard = AuthorizationGuard::new(tokens.clone(), principals.clone(), ownership);
        Fixture {
            guard,
            tokens,
            principals,
            companies,
        }
    }

    async fn principal(f: &Fixture, email: &str, role: Role, active: bool) -> Principal {
        let p = f
            .principals
            .insert(NewPrincipal {
                email: email.into(),
                name: "N".into(),
                password_hash: "h".into(),
                salt: "s".into(),
                role,
                confirmation_token: format!("tok-{email}"),
            })
            .await
            .unwrap();
        if active {
            f.principals
                .redeem_confirmation_token(&format!("tok-{email}"))
                .await
                .unwrap()
                .unwrap()
        } else {
            p
        }
    }

    #[tokio::test]
    async fn authenticate_rereads_principal_state() {
        let f = fixture();
        let p = principal(&f, "a@x.com", Role::User, true).await;
        let token = f.tokens.issue_access_token(p.uuid).unwrap();

        let resolved = f.guard.authenticate(&token).await.unwrap();
        assert_eq!(resolved.role, Role::User);

        f.principals
            .update_profile(
                p.id,
                &ProfileUpdate {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(f.guard.authenticate(&token).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn deleted_principal_token_is_rejected() {
        let f = fixture();
        let p = principal(&f, "a@x.com", Role::User, true).await;
        let token = f.tokens.issue_access_token(p.uuid).unwrap();
        f.principals.delete_by_uuid(p.uuid).await.unwrap();
        assert!(matches!(
            f.guard.authenticate(&token).await.unwrap_err(),
            AuthError::InvalidToken(TokenRejection::UnknownPrincipal)
        ));
    }

    #[tokio::test]
    async fn inactive_principal_reads_profile_only() {
        let f = fixture();
        let p = principal(&f, "a@x.com", Role::User, false).await;
        let token = f.tokens.issue_access_token(p.uuid).unwrap();

        assert!(f.guard.authorize(Some(&token), Access::Profile).await.is_ok());
        assert!(matches!(
            f.guard
                .authorize(Some(&token), Access::Authenticated)
                .await
                .unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn role_access_requires_matching_role() {
        let f = fixture();
        let user = principal(&f, "u@x.com", Role::User, true).await;
        let admin = principal(&f, "a@x.com", Role::Admin, true).await;
        let admin_only = Access::Role(Role::Admin);

        let user_token = f.tokens.issue_access_token(user.uuid).unwrap();
        let admin_token = f.tokens.issue_access_token(admin.uuid).unwrap();
        assert!(matches!(
            f.guard.authorize(Some(&user_token), admin_only).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
        assert!(f.guard.authorize(Some(&admin_token), admin_only).await.is_ok());
    }

    #[tokio::test]
    async fn missing_token_only_passes_public_routes() {
        let f = fixture();
        assert!(f.guard.authorize(None, Access::Public).await.unwrap().is_none());
        assert!(matches!(
            f.guard.authorize(None, Access::Profile).await.unwrap_err(),
            AuthError::InvalidToken(TokenRejection::Missing)
        ));
    }

    #[tokio::test]
    async fn ownership_rules() {
        let f = fixture();
        let owner = principal(&f, "o@x.com", Role::User, true).await;
        let stranger = principal(&f, "s@x.com", Role::User, true).await;
        let admin = principal(&f, "a@x.com", Role::Admin, true).await;
        let acme = f.companies.insert("Acme").await.unwrap();
        f.companies.link_principal(owner.id, acme.id).await.unwrap();

        assert!(f.guard.require_owner(&owner, acme.uuid).await.is_ok());
        assert!(f.guard.require_owner(&admin, acme.uuid).await.is_ok());
        assert!(matches!(
            f.guard.require_owner(&stranger, acme.uuid).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn profile_update_rules() {
        let f = fixture();
        let user = principal(&f, "u@x.com", Role::User, true).await;
        let other = principal(&f, "o@x.com", Role::User, false).await;
        let admin = principal(&f, "a@x.com", Role::Admin, true).await;

        let rename = ProfileUpdate {
            name: Some("New".into()),
            ..Default::default()
        };
        let promote = ProfileUpdate {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let activate = ProfileUpdate {
            is_active: Some(true),
            ..Default::default()
        };

        assert!(AuthorizationGuard::check_profile_update(&user, &user, &rename).is_ok());
        assert!(matches!(
            AuthorizationGuard::check_profile_update(&user, &other, &rename),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            AuthorizationGuard::check_profile_update(&user, &user, &promote),
            Err(AuthError::Forbidden(_))
        ));
        assert!(AuthorizationGuard::check_profile_update(&admin, &user, &promote).is_ok());
        assert!(matches!(
            AuthorizationGuard::check_profile_update(&other, &other, &activate),
            Err(AuthError::Validation(_))
        ));
        assert!(AuthorizationGuard::check_profile_update(&admin, &other, &activate).is_ok());

        let dormant_admin = principal(&f, "d@x.com", Role::Admin, false).await;
        assert!(matches!(
            AuthorizationGuard::check_profile_update(&dormant_admin, &other, &activate),
            Err(AuthError::Validation(_))
        ));
    }
}
