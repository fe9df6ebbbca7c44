//! Credential store: principal creation and password verification.

use std::sync::Arc;

use tracing::{debug, info};

use super::password::{self, HashedPassword};
use super::store::{PrincipalStore, normalize_email};
use super::{AuthError, AuthResult, generate_single_use_token};
use crate::models::auth::{NewPrincipal, Principal, Role};

/// Maximum length of email and name fields.
pub const MAX_FIELD_LENGTH: usize = 100;

/// Minimal structural email check; delivery proves the rest.
pub fn validate_email(email: &str) -> AuthResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(AuthError::Validation("Enter a valid email address".into()));
    }
    if email.len() > MAX_FIELD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Email must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> AuthResult<()> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".into()));
    }
    if name.len() > MAX_FIELD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Name must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Durable storage and verification of principal credentials.
pub struct CredentialStore {
    store: Arc<dyn PrincipalStore>,
    bcrypt_cost: u32,
    /// Verified against when the email is unknown, so both paths pay one bcrypt.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn PrincipalStore>, bcrypt_cost: u32) -> AuthResult<Self> {
        let dummy_hash = password::hash_password("timing-equalizer", bcrypt_cost)?.hash;
        Ok(Self {
            store,
            bcrypt_cost,
            dummy_hash,
        })
    }

    /// The underlying repository.
    pub fn store(&self) -> &Arc<dyn PrincipalStore> {
        &self.store
    }

    /// Validate and hash a new password.
    pub fn hash_password(&self, plaintext: &str) -> AuthResult<HashedPassword> {
        password::validate_password(plaintext)?;
        password::hash_password(plaintext, self.bcrypt_cost)
    }

    /// Create an inactive principal with a fresh confirmation token.
    pub async fn create_principal(
        &self,
        email: &str,
        name: &str,
        plaintext_password: &str,
        role: Role,
    ) -> AuthResult<Principal> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_name(name)?;
        let hashed = self.hash_password(plaintext_password)?;

        let principal = self
            .store
            .insert(NewPrincipal {
                email,
                name: name.trim().to_string(),
                password_hash: hashed.hash,
                salt: hashed.salt,
                role,
                confirmation_token: generate_single_use_token(),
            })
            .await?;

        info!(uuid = %principal.uuid, %role, "principal created");
        Ok(principal)
    }

    /// Return the principal only when the password matches.
    ///
    /// An unknown email still costs one bcrypt verification and yields the
    /// same `None` as a wrong password.
    pub async fn verify_credentials(
        &self,
        email: &str,
        plaintext_password: &str,
    ) -> AuthResult<Option<Principal>> {
        let email = normalize_email(email);
        match self.store.find_by_email(&email).await? {
            Some(principal) => {
                if password::verify_password(plaintext_password, &principal.password_hash)? {
                    Ok(Some(principal))
                } else {
                    debug!(uuid = %principal.uuid, "password mismatch");
                    Ok(None)
                }
            }
            None => {
                let _ = password::verify_password(plaintext_password, &self.dummy_hash)?;
                Ok(None)
            }
        }
    }

    /// Re-salt and rehash the password, clearing any pending recover token.
    pub async fn change_password(&self, principal_id: i64, new_password: &str) -> AuthResult<()> {
        let hashed = self.hash_password(new_password)?;
        if !self
            .store
            .update_password(principal_id, &hashed.hash, &hashed.salt)
            .await?
        {
            return Err(AuthError::NotFound("User not found".into()));
        }
        info!(principal_id, "password changed");
        Ok(())
    }
}
