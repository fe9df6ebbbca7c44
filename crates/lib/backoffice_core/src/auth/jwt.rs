//! JWT token generation and verification.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AuthError, AuthResult, TokenRejection};
use crate::models::auth::{TokenClaims, TokenKind, TokenPair, VerifiedToken};

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl TokenSettings {
    /// Settings with default lifetimes.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

/// Signing material for one token kind.
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// Issues and verifies HS256 access/refresh tokens. Stateless: nothing is
/// persisted here; refresh-token hashes live in the principal store.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl TokenService {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            access: KeyPair::new(&settings.access_secret, settings.access_ttl_secs),
            refresh: KeyPair::new(&settings.refresh_secret, settings.refresh_ttl_secs),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn issue(&self, principal_uuid: Uuid, kind: TokenKind) -> AuthResult<String> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let claims = TokenClaims {
            sub: principal_uuid,
            kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Sign a short-lived access token for the principal.
    pub fn issue_access_token(&self, principal_uuid: Uuid) -> AuthResult<String> {
        self.issue(principal_uuid, TokenKind::Access)
    }

    /// Sign a long-lived refresh token for the principal.
    pub fn issue_refresh_token(&self, principal_uuid: Uuid) -> AuthResult<String> {
        self.issue(principal_uuid, TokenKind::Refresh)
    }

    /// Sign a fresh access + refresh pair.
    pub fn issue_pair(&self, principal_uuid: Uuid) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            token: self.issue_access_token(principal_uuid)?,
            refresh_token: self.issue_refresh_token(principal_uuid)?,
        })
    }

    /// Check signature, expiry and kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, TokenRejection> {
        let data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| {
                let rejection = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenRejection::Expired,
                    ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                    _ => TokenRejection::Malformed,
                };
                debug!(%kind, reason = rejection.reason(), "token verification failed");
                rejection
            })?;

        if data.claims.kind != kind {
            return Err(TokenRejection::WrongKind {
                expected: kind,
                found: data.claims.kind,
            });
        }

        Ok(VerifiedToken {
            principal_uuid: data.claims.sub,
            exp: data.claims.exp,
        })
    }
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve a signing secret: first non-empty env var in `vars`, otherwise a
/// secret generated once and persisted to `<data dir>/backoffice/<file_name>`.
pub fn resolve_secret(vars: &[&str], file_name: &str) -> String {
    for var in vars {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new signing secret");
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backoffice")
        .join(file_name)
}
