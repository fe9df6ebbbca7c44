//! Password hashing via bcrypt with an explicit per-principal salt.

use super::{AuthError, AuthResult, to_hex};

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// bcrypt ignores input past 72 bytes; longer passwords are refused outright.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// A bcrypt hash plus the salt it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub hash: String,
    /// Hex-encoded 16-byte salt, also embedded in `hash`.
    pub salt: String,
}

/// Reject passwords bcrypt cannot hash faithfully.
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Hash a password with a freshly generated salt.
pub fn hash_password(password: &str, cost: u32) -> AuthResult<HashedPassword> {
    let salt: [u8; 16] = rand::random();
    let parts = bcrypt::hash_with_salt(password, cost, salt)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))?;
    Ok(HashedPassword {
        hash: parts.format_for_version(bcrypt::Version::TwoB),
        salt: to_hex(&salt),
    })
}

/// Verify a password against a stored bcrypt hash.
///
/// The comparison runs in constant time inside `bcrypt::verify`.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("pw123456", TEST_COST).unwrap();
        assert!(verify_password("pw123456", &hashed.hash).unwrap());
        assert!(!verify_password("wrongpw", &hashed.hash).unwrap());
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let a = hash_password("same-password", TEST_COST).unwrap();
        let b = hash_password("same-password", TEST_COST).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.salt.len(), 32);
    }

    #[test]
    fn malformed_hash_is_an_internal_error() {
        assert!(matches!(
            verify_password("pw", "not-a-bcrypt-hash"),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn short_and_overlong_passwords_rejected() {
        assert!(matches!(validate_password("12345"), Err(AuthError::Validation(_))));
        assert!(validate_password("123456").is_ok());
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(validate_password(&long), Err(AuthError::Validation(_))));
    }
}
