//! API server configuration.

use std::str::FromStr;

use backoffice_core::auth::jwt::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS, TokenSettings, resolve_secret,
};
use backoffice_core::auth::ownership::DEFAULT_OWNERSHIP_TTL_MS;
use backoffice_core::auth::password::DEFAULT_BCRYPT_COST;
use backoffice_core::services::ServiceSettings;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Access-token signing secret.
    pub jwt_secret: String,
    /// Refresh-token signing secret.
    pub jwt_refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Sender address for account mails.
    pub mail_from: String,
    pub ownership_cache_ttl_ms: i64,
}

// Secrets stay out of debug output.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("mail_from", &self.mail_from)
            .field("ownership_cache_ttl_ms", &self.ownership_cache_ttl_ms)
            .finish_non_exhaustive()
    }
}

/// Parse an env var, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                      | Default                               |
    /// |-------------------------------|---------------------------------------|
    /// | `BIND_ADDR`                   | `127.0.0.1:3100`                      |
    /// | `DATABASE_URL`                | `postgres://localhost:5432/backoffice` |
    /// | `JWT_SECRET`                  | generated & persisted to file         |
    /// | `JWT_REFRESH_SECRET`          | generated & persisted to file         |
    /// | `JWT_EXPIRES_IN_SECS`         | `900`                                 |
    /// | `JWT_REFRESH_EXPIRES_IN_SECS` | `604800`                              |
    /// | `BCRYPT_COST`                 | `10`                                  |
    /// | `MAIL_FROM`                   | `noreply@backoffice.local`            |
    /// | `OWNERSHIP_CACHE_TTL_MS`      | `30000`                               |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/backoffice".into()),
            jwt_secret: resolve_secret(&["JWT_SECRET"], "jwt-secret"),
            jwt_refresh_secret: resolve_secret(&["JWT_REFRESH_SECRET"], "jwt-refresh-secret"),
            access_ttl_secs: env_or("JWT_EXPIRES_IN_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_ttl_secs: env_or("JWT_REFRESH_EXPIRES_IN_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS),
            bcrypt_cost: env_or("BCRYPT_COST", DEFAULT_BCRYPT_COST),
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@backoffice.local".into()),
            ownership_cache_ttl_ms: env_or("OWNERSHIP_CACHE_TTL_MS", DEFAULT_OWNERSHIP_TTL_MS),
        }
    }

    /// Fixed secrets, default lifetimes, minimum bcrypt cost. For tests.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: String::new(),
            jwt_secret: "test-access-secret".into(),
            jwt_refresh_secret: "test-refresh-secret".into(),
            access_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            bcrypt_cost: 4,
            mail_from: "noreply@backoffice.local".into(),
            ownership_cache_ttl_ms: DEFAULT_OWNERSHIP_TTL_MS,
        }
    }

    /// Settings for the core service graph.
    pub fn service_settings(&self) -> ServiceSettings {
        let mut tokens = TokenSettings::new(&self.jwt_secret, &self.jwt_refresh_secret);
        tokens.access_ttl_secs = self.access_ttl_secs;
        tokens.refresh_ttl_secs = self.refresh_ttl_secs;
        ServiceSettings {
            tokens,
            bcrypt_cost: self.bcrypt_cost,
            mail_from: self.mail_from.clone(),
            ownership_ttl_ms: self.ownership_cache_ttl_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_settings_carry_lifetimes() {
        let mut config = ApiConfig::for_tests();
        config.access_ttl_secs = 60;
        let settings = config.service_settings();
        assert_eq!(settings.tokens.access_ttl_secs, 60);
        assert_eq!(settings.tokens.refresh_secret, "test-refresh-secret");
        assert_eq!(settings.bcrypt_cost, 4);
    }

    #[test]
    fn debug_hides_secrets() {
        let out = format!("{:?}", ApiConfig::for_tests());
        assert!(!out.contains("test-access-secret"));
    }
}
