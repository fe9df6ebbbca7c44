//! Principal repository interface.
//!
//! Every decision in the auth services is made on data fetched explicitly
//! through this trait. Mutations touch a single principal row.

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthResult;
use crate::models::auth::{NewPrincipal, Principal, ProfileUpdate, UserQuery};

/// Storage for principal records.
///
/// The `redeem_*`, `reset_*` and `swap_*` methods are conditional updates:
/// they only write when the stored token still matches, and report whether a
/// row changed. Concurrent redemptions of the same token therefore succeed
/// exactly once.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Insert a new principal. Duplicate email yields `AuthError::Conflict`.
    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal>;

    async fn find_by_id(&self, id: i64) -> AuthResult<Option<Principal>>;

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Principal>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>>;

    async fn find_by_recover_token(&self, token: &str) -> AuthResult<Option<Principal>>;

    /// Clear `confirmation_token` and set `is_active` where the token matches.
    async fn redeem_confirmation_token(&self, token: &str) -> AuthResult<Option<Principal>>;

    async fn set_recover_token(&self, id: i64, token: &str) -> AuthResult<()>;

    /// Replace the password hash and salt, clearing any pending recover token.
    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> AuthResult<bool>;

    /// Replace the password where `recover_token` matches, consuming the token.
    async fn reset_password_with_token(
        &self,
        token: &str,
        password_hash: &str,
        salt: &str,
    ) -> AuthResult<Option<Principal>>;

    /// Unconditionally store (or clear) the refresh-token hash.
    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> AuthResult<()>;

    /// Replace the refresh-token hash only if it still equals `expected`.
    async fn swap_refresh_token_hash(&self, id: i64, expected: &str, new: &str)
    -> AuthResult<bool>;

    /// Apply a partial profile update and return the updated record.
    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> AuthResult<Option<Principal>>;

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool>;

    /// Filtered, paginated listing. Returns the page and the total match count.
    async fn list(&self, query: &UserQuery) -> AuthResult<(Vec<Principal>, i64)>;
}

/// Canonical form for stored and looked-up email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
