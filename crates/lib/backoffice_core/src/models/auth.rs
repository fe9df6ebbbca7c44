//! Authentication domain models.
//!
//! `Principal` is the full stored record and never leaves the core;
//! `PrincipalProfile` is the shape handed to API clients.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted to a principal. `Admin` is the only elevated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Stored principal record, credentials included.
#[derive(Clone)]
pub struct Principal {
    /// Internal row id. Never serialized towards clients.
    pub id: i64,
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    pub is_active: bool,
    pub confirmation_token: Option<String>,
    pub recover_token: Option<String>,
    pub current_hashed_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Credentials and single-use tokens stay out of log output.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("pending_confirmation", &self.confirmation_token.is_some())
            .field("pending_recovery", &self.recover_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Public view of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalProfile {
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<&Principal> for PrincipalProfile {
    fn from(p: &Principal) -> Self {
        Self {
            uuid: p.uuid,
            email: p.email.clone(),
            name: p.name.clone(),
            role: p.role,
            is_active: p.is_active,
        }
    }
}

impl From<Principal> for PrincipalProfile {
    fn from(p: Principal) -> Self {
        Self::from(&p)
    }
}

/// Insert payload for a freshly signed-up principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    pub confirmation_token: String,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Filter for the admin user listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Which signing key and lifetime a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims embedded in access and refresh tokens.
///
/// Only identity travels in the token; role and activation state are
/// re-read from the store on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the principal's public uuid.
    pub sub: Uuid,
    pub kind: TokenKind,
    /// Unique per token so two tokens minted in the same second never collide.
    pub jti: Uuid,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Result of a successful signature + expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub principal_uuid: Uuid,
    pub exp: i64,
}

/// Token pair returned by sign-in and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }

    #[test]
    fn debug_output_hides_credentials() {
        let now = Utc::now();
        let p = Principal {
            id: 7,
            uuid: Uuid::nil(),
            email: "a@x.com".into(),
            name: "A".into(),
            password_hash: "$2b$04$secret-hash".into(),
            salt: "cafebabe".into(),
            role: Role::User,
            is_active: false,
            confirmation_token: Some("tok".into()),
            recover_token: None,
            current_hashed_refresh_token: Some("deadbeef".into()),
            created_at: now,
            updated_at: now,
        };
        let out = format!("{p:?}");
        assert!(!out.contains("secret-hash"));
        assert!(!out.contains("cafebabe"));
        assert!(!out.contains("deadbeef"));
        assert!(out.contains("pending_confirmation: true"));
    }

    #[test]
    fn profile_excludes_internal_fields() {
        let now = Utc::now();
        let p = Principal {
            id: 1,
            uuid: Uuid::nil(),
            email: "a@x.com".into(),
            name: "A".into(),
            password_hash: "h".into(),
            salt: "s".into(),
            role: Role::Admin,
            is_active: true,
            confirmation_token: None,
            recover_token: None,
            current_hashed_refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(PrincipalProfile::from(&p)).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert!(obj.get("id").is_none());
        assert_eq!(json["role"], "ADMIN");
    }
}
