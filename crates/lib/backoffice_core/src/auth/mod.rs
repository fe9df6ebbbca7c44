//! Authentication and authorization logic.
//!
//! Password hashing, token issuance, the principal repository, account
//! lifecycle flows, and the guard that gates every protected operation.

pub mod credentials;
pub mod guard;
pub mod jwt;
pub mod lifecycle;
pub mod memory;
pub mod ownership;
pub mod password;
pub mod queries;
pub mod store;

use thiserror::Error;

use crate::models::auth::TokenKind;

/// Convenience alias for auth results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors.
///
/// Each variant is one member of the error taxonomy; the API layer maps them
/// onto HTTP statuses without inspecting messages.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad email/password or inactive account. Carries no detail.
    #[error("Invalid credentials")]
    Credentials,

    #[error("Invalid token: {0}")]
    InvalidToken(TokenRejection),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::Conflict("Email address already registered".into())
            }
            _ => AuthError::Storage(e),
        }
    }
}

impl From<TokenRejection> for AuthError {
    fn from(r: TokenRejection) -> Self {
        AuthError::InvalidToken(r)
    }
}

/// Why a token was refused. Logged, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("no bearer token")]
    Missing,

    #[error("malformed token")]
    Malformed,

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("expected {expected} token, got {found}")]
    WrongKind { expected: TokenKind, found: TokenKind },

    /// Refresh token no longer matches the stored hash (rotated or revoked).
    #[error("refresh token revoked")]
    Revoked,

    #[error("principal no longer exists")]
    UnknownPrincipal,

    #[error("principal is not active")]
    Inactive,
}

impl TokenRejection {
    /// Stable label for the `reason` field of log events.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenRejection::Missing => "missing",
            TokenRejection::Malformed => "malformed",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::Expired => "expired",
            TokenRejection::WrongKind { .. } => "wrong_kind",
            TokenRejection::Revoked => "revoked",
            TokenRejection::UnknownPrincipal => "unknown_principal",
            TokenRejection::Inactive => "inactive",
        }
    }
}

/// Render random bytes as lowercase hex.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a single-use token: 32 random bytes, hex-encoded.
pub fn generate_single_use_token() -> String {
    let bytes: [u8; 32] = rand::random();
    to_hex(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_use_tokens_are_64_hex_chars_and_unique() {
        let a = generate_single_use_token();
        let b = generate_single_use_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn rejection_reasons_are_distinct() {
        let all = [
            TokenRejection::Missing,
            TokenRejection::Malformed,
            TokenRejection::BadSignature,
            TokenRejection::Expired,
            TokenRejection::WrongKind {
                expected: TokenKind::Access,
                found: TokenKind::Refresh,
            },
            TokenRejection::Revoked,
            TokenRejection::UnknownPrincipal,
            TokenRejection::Inactive,
        ];
        let mut reasons: Vec<_> = all.iter().map(|r| r.reason()).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), all.len());
    }
}
