//! User administration: admin creation, lookup, listing, profile updates.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::credentials::{validate_email, validate_name};
use crate::auth::guard::AuthorizationGuard;
use crate::auth::lifecycle::{AccountLifecycle, SignUp};
use crate::auth::store::{PrincipalStore, normalize_email};
use crate::auth::{AuthError, AuthResult};
use crate::models::auth::{Principal, ProfileUpdate, Role, UserQuery};

fn user_not_found() -> AuthError {
    AuthError::NotFound("User not found".into())
}

pub struct UserService {
    principals: Arc<dyn PrincipalStore>,
    lifecycle: Arc<AccountLifecycle>,
}

impl UserService {
    pub fn new(principals: Arc<dyn PrincipalStore>, lifecycle: Arc<AccountLifecycle>) -> Self {
        Self {
            principals,
            lifecycle,
        }
    }

    /// Register an ADMIN. Like signup, the account stays inactive until the
    /// confirmation token mailed to it is redeemed.
    pub async fn create_admin(&self, request: SignUp) -> AuthResult<Principal> {
        self.lifecycle.register(request, Role::Admin).await
    }

    pub async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Principal> {
        self.principals
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn list(&self, query: &UserQuery) -> AuthResult<(Vec<Principal>, i64)> {
        self.principals.list(query).await
    }

    /// Generic profile update on behalf of `actor`.
    pub async fn update(
        &self,
        actor: &Principal,
        target_uuid: Uuid,
        mut update: ProfileUpdate,
    ) -> AuthResult<Principal> {
        AuthorizationGuard::require_self_or_admin(actor, target_uuid)?;
        let target = self.find_by_uuid(target_uuid).await?;
        AuthorizationGuard::check_profile_update(actor, &target, &update)?;

        if let Some(email) = update.email.as_mut() {
            *email = normalize_email(email);
            validate_email(email)?;
        }
        if let Some(name) = update.name.as_mut() {
            validate_name(name)?;
            *name = name.trim().to_string();
        }

        let updated = self
            .principals
            .update_profile(target.id, &update)
            .await?
            .ok_or_else(user_not_found)?;
        info!(actor = %actor.uuid, target = %updated.uuid, "profile updated");
        Ok(updated)
    }

    pub async fn delete(&self, uuid: Uuid) -> AuthResult<()> {
        if !self.principals.delete_by_uuid(uuid).await? {
            return Err(user_not_found());
        }
        info!(%uuid, "user deleted");
        Ok(())
    }
}
