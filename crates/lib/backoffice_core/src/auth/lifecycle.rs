//! Account lifecycle: signup, confirmation, sign-in, refresh, recovery.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::credentials::CredentialStore;
use super::jwt::{TokenService, hash_refresh_token};
use super::store::normalize_email;
use super::{AuthError, AuthResult, TokenRejection, generate_single_use_token};
use crate::models::auth::{Principal, Role, TokenKind, TokenPair};
use crate::notify::{Mail, Notifier, Template};

/// Signup request as received from the API layer.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub name: String,
    pub password: String,
    pub password_confirmation: String,
}

fn ensure_confirmed(password: &str, confirmation: &str) -> AuthResult<()> {
    if password != confirmation {
        return Err(AuthError::Validation(
            "Password and password confirmation do not match".into(),
        ));
    }
    Ok(())
}

/// Log a refresh-token rejection with its reason and convert it.
fn refresh_rejected(rejection: TokenRejection) -> AuthError {
    warn!(reason = rejection.reason(), "refresh token rejected");
    rejection.into()
}

/// Orchestrates the multi-step flows around account state.
pub struct AccountLifecycle {
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
    notifier: Arc<dyn Notifier>,
    mail_from: String,
}

impl AccountLifecycle {
    pub fn new(
        credentials: Arc<CredentialStore>,
        tokens: Arc<TokenService>,
        notifier: Arc<dyn Notifier>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            tokens,
            notifier,
            mail_from: mail_from.into(),
        }
    }

    /// Register an inactive USER principal and send the confirmation mail.
    pub async fn sign_up(&self, request: SignUp) -> AuthResult<Principal> {
        self.register(request, Role::User).await
    }

    /// Register an inactive principal with `role` and send the confirmation
    /// mail. A delivery failure is logged but does not undo the registration.
    pub async fn register(&self, request: SignUp, role: Role) -> AuthResult<Principal> {
        ensure_confirmed(&request.password, &request.password_confirmation)?;
        let principal = self
            .credentials
            .create_principal(&request.email, &request.name, &request.password, role)
            .await?;

        if let Some(token) = &principal.confirmation_token {
            let mail = Mail::new(
                Template::EmailConfirmation,
                &self.mail_from,
                &principal.email,
                token,
            );
            if let Err(e) = self.notifier.send(mail).await {
                error!(uuid = %principal.uuid, error = %e, "confirmation mail not sent");
            }
        }
        Ok(principal)
    }

    /// Create an already-confirmed ADMIN, or return the active ADMIN already
    /// registered under `email`. Any other existing record is a conflict.
    /// Used to seed the first administrator at start-up; sends no mail.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> AuthResult<Principal> {
        if let Some(existing) = self
            .credentials
            .store()
            .find_by_email(&normalize_email(email))
            .await?
        {
            if existing.is_admin() && existing.is_active {
                return Ok(existing);
            }
            warn!(
                uuid = %existing.uuid,
                role = existing.role.as_str(),
                active = existing.is_active,
                "bootstrap admin refused"
            );
            return Err(AuthError::Conflict(
                "Email address already registered to a non-administrator or inactive account"
                    .into(),
            ));
        }
        let created = self
            .credentials
            .create_principal(email, name, password, Role::Admin)
            .await?;
        let token = created.confirmation_token.as_deref().unwrap_or_default();
        let admin = self
            .credentials
            .store()
            .redeem_confirmation_token(token)
            .await?
            .ok_or_else(|| AuthError::Internal("admin confirmation lost".into()))?;
        info!(uuid = %admin.uuid, "bootstrap admin ready");
        Ok(admin)
    }

    /// Exchange credentials for a token pair. Inactive accounts are refused
    /// with the same error as a wrong password.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let Some(principal) = self.credentials.verify_credentials(email, password).await? else {
            warn!(reason = "bad_credentials", "sign-in refused");
            return Err(AuthError::Credentials);
        };
        if !principal.is_active {
            warn!(uuid = %principal.uuid, reason = "inactive", "sign-in refused");
            return Err(AuthError::Credentials);
        }

        let pair = self.tokens.issue_pair(principal.uuid)?;
        self.credentials
            .store()
            .set_refresh_token_hash(principal.id, Some(&hash_refresh_token(&pair.refresh_token)))
            .await?;
        info!(uuid = %principal.uuid, "signed in");
        Ok(pair)
    }

    /// Redeem a confirmation token. Succeeds at most once per token.
    pub async fn confirm_email(&self, token: &str) -> AuthResult<Principal> {
        match self.credentials.store().redeem_confirmation_token(token).await? {
            Some(principal) => {
                info!(uuid = %principal.uuid, "email confirmed");
                Ok(principal)
            }
            None => {
                warn!(reason = "unknown_confirmation_token", "confirmation refused");
                Err(AuthError::NotFound("Invalid confirmation token".into()))
            }
        }
    }

    /// Issue a fresh recover token for `email` and mail it.
    pub async fn send_recover_password_email(&self, email: &str) -> AuthResult<bool> {
        let email = normalize_email(email);
        let Some(principal) = self.credentials.store().find_by_email(&email).await? else {
            return Err(AuthError::NotFound("User not found".into()));
        };

        let token = generate_single_use_token();
        self.credentials
            .store()
            .set_recover_token(principal.id, &token)
            .await?;
        let mail = Mail::new(Template::RecoverPassword, &self.mail_from, &principal.email, &token);
        self.notifier
            .send(mail)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(uuid = %principal.uuid, "recover mail sent");
        Ok(true)
    }

    /// Set a new password using a recover token, consuming the token.
    pub async fn reset_password(
        &self,
        recover_token: &str,
        password: &str,
        password_confirmation: &str,
    ) -> AuthResult<()> {
        let not_found = || {
            warn!(reason = "unknown_recover_token", "password reset refused");
            AuthError::NotFound("Invalid recover token".into())
        };

        if self
            .credentials
            .store()
            .find_by_recover_token(recover_token)
            .await?
            .is_none()
        {
            return Err(not_found());
        }
        ensure_confirmed(password, password_confirmation)?;

        let hashed = self.credentials.hash_password(password)?;
        let principal = self
            .credentials
            .store()
            .reset_password_with_token(recover_token, &hashed.hash, &hashed.salt)
            .await?
            .ok_or_else(not_found)?;
        info!(uuid = %principal.uuid, "password reset");
        Ok(())
    }

    /// Change the password of the principal identified by `principal_uuid`.
    /// Authorization (self-or-admin) is the caller's job.
    pub async fn change_password(
        &self,
        principal_uuid: Uuid,
        password: &str,
        password_confirmation: &str,
    ) -> AuthResult<()> {
        ensure_confirmed(password, password_confirmation)?;
        let principal = self
            .credentials
            .store()
            .find_by_uuid(principal_uuid)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))?;
        self.credentials.change_password(principal.id, password).await
    }

    /// Exchange a refresh token for a new pair, identifying the principal
    /// from the token's subject.
    pub async fn refresh(&self, presented: &str) -> AuthResult<TokenPair> {
        let verified = self
            .tokens
            .verify(presented, TokenKind::Refresh)
            .map_err(refresh_rejected)?;
        self.rotate_refresh_token(verified.principal_uuid, presented)
            .await
    }

    /// Rotate the refresh token of `principal_uuid`.
    ///
    /// The stored hash is swapped only if it still equals the hash of
    /// `presented`, so a refresh token can be spent once.
    pub async fn rotate_refresh_token(
        &self,
        principal_uuid: Uuid,
        presented: &str,
    ) -> AuthResult<TokenPair> {
        let verified = self
            .tokens
            .verify(presented, TokenKind::Refresh)
            .map_err(refresh_rejected)?;
        if verified.principal_uuid != principal_uuid {
            return Err(refresh_rejected(TokenRejection::UnknownPrincipal));
        }

        let principal = self
            .credentials
            .store()
            .find_by_uuid(principal_uuid)
            .await?
            .ok_or_else(|| refresh_rejected(TokenRejection::UnknownPrincipal))?;
        if !principal.is_active {
            return Err(refresh_rejected(TokenRejection::Inactive));
        }

        let pair = self.tokens.issue_pair(principal.uuid)?;
        let swapped = self
            .credentials
            .store()
            .swap_refresh_token_hash(
                principal.id,
                &hash_refresh_token(presented),
                &hash_refresh_token(&pair.refresh_token),
            )
            .await?;
        if !swapped {
            return Err(refresh_rejected(TokenRejection::Revoked));
        }

        info!(uuid = %principal.uuid, "refresh token rotated");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenSettings;
    use crate::auth::memory::InMemoryPrincipalStore;
    use crate::notify::RecordingNotifier;

    struct Fixture {
        lifecycle: AccountLifecycle,
        credentials: Arc<CredentialStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture() -> Fixture {
        let credentials =
            Arc::new(CredentialStore::new(Arc::new(InMemoryPrincipalStore::new()), 4).unwrap());
        let tokens = Arc::new(TokenService::new(&TokenSettings::new("access", "refresh")));
        let notifier = Arc::new(RecordingNotifier::new());
        let lifecycle = AccountLifecycle::new(
            credentials.clone(),
            tokens,
            notifier.clone(),
            "noreply@backoffice.local",
        );
        Fixture {
            lifecycle,
            credentials,
            notifier,
        }
    }

    fn signup(email: &str, password: &str, confirmation: &str) -> SignUp {
        SignUp {
            email: email.into(),
            name: "A".into(),
            password: password.into(),
            password_confirmation: confirmation.into(),
        }
    }

    /// Sign up and confirm, returning the active principal.
    async fn active_principal(f: &Fixture, email: &str) -> Principal {
        let p = f
            .lifecycle
            .sign_up(signup(email, "pw123456", "pw123456"))
            .await
            .unwrap();
        let token = p.confirmation_token.clone().unwrap();
        f.lifecycle.confirm_email(&token).await.unwrap()
    }

    #[tokio::test]
    async fn signup_creates_inactive_principal_and_mails_token() {
        let f = fixture();
        let p = f
            .lifecycle
            .sign_up(signup("a@x.com", "pw123456", "pw123456"))
            .await
            .unwrap();
        assert!(!p.is_active);
        assert_eq!(p.role, Role::User);
        let token = p.confirmation_token.clone().unwrap();

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].from, "noreply@backoffice.local");
        assert_eq!(sent[0].template, Template::EmailConfirmation);
        assert_eq!(sent[0].context.token, token);
    }

    #[tokio::test]
    async fn bootstrap_admin_is_active_and_idempotent() {
        let f = fixture();
        let admin = f
            .lifecycle
            .bootstrap_admin("root@x.com", "Root", "pw123456")
            .await
            .unwrap();
        assert!(admin.is_active && admin.is_admin());
        assert!(admin.confirmation_token.is_none());
        let again = f
            .lifecycle
            .bootstrap_admin("ROOT@x.com", "Root", "pw123456")
            .await
            .unwrap();
        assert_eq!(again.uuid, admin.uuid);
        assert!(f.notifier.sent().is_empty());
        assert!(f.lifecycle.sign_in("root@x.com", "pw123456").await.is_ok());
    }

    #[tokio::test]
    async fn bootstrap_admin_refuses_existing_user_account() {
        let f = fixture();
        f.lifecycle
            .sign_up(signup("root@x.com", "pw123456", "pw123456"))
            .await
            .unwrap();
        let err = f
            .lifecycle
            .bootstrap_admin("root@x.com", "Root", "pw123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        let stored = f
            .credentials
            .store()
            .find_by_email("root@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.role, Role::User);
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn signup_with_mismatched_confirmation_creates_nothing() {
        let f = fixture();
        let err = f
            .lifecycle
            .sign_up(signup("a@x.com", "pw123456", "pw000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(f.credentials.store().find_by_email("a@x.com").await.unwrap().is_none());
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn confirmation_token_works_once() {
        let f = fixture();
        let p = f
            .lifecycle
            .sign_up(signup("a@x.com", "pw123456", "pw123456"))
            .await
            .unwrap();
        let token = p.confirmation_token.unwrap();

        let confirmed = f.lifecycle.confirm_email(&token).await.unwrap();
        assert!(confirmed.is_active);
        assert!(confirmed.confirmation_token.is_none());

        let err = f.lifecycle.confirm_email(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_confirmations_succeed_once() {
        let f = fixture();
        let p = f
            .lifecycle
            .sign_up(signup("a@x.com", "pw123456", "pw123456"))
            .await
            .unwrap();
        let token = p.confirmation_token.unwrap();

        let (a, b) = tokio::join!(
            f.lifecycle.confirm_email(&token),
            f.lifecycle.confirm_email(&token)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    #[tokio::test]
    async fn sign_in_requires_activation() {
        let f = fixture();
        let p = f
            .lifecycle
            .sign_up(signup("a@x.com", "pw123456", "pw123456"))
            .await
            .unwrap();

        let err = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::Credentials));

        f.lifecycle
            .confirm_email(p.confirmation_token.as_deref().unwrap())
            .await
            .unwrap();
        let pair = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();
        assert_eq!(pair.token.split('.').count(), 3);
        assert_eq!(pair.refresh_token.split('.').count(), 3);

        let stored = f.credentials.store().find_by_uuid(p.uuid).await.unwrap().unwrap();
        assert_eq!(
            stored.current_hashed_refresh_token,
            Some(hash_refresh_token(&pair.refresh_token))
        );
    }

    #[tokio::test]
    async fn sign_in_errors_do_not_reveal_email_existence() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        let wrong_pw = f.lifecycle.sign_in("a@x.com", "wrongpw").await.unwrap_err();
        let unknown = f.lifecycle.sign_in("b@x.com", "pw123456").await.unwrap_err();
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn refresh_token_can_be_spent_once() {
        let f = fixture();
        let p = active_principal(&f, "a@x.com").await;
        let first = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();

        let rotated = f
            .lifecycle
            .rotate_refresh_token(p.uuid, &first.refresh_token)
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, first.refresh_token);

        let err = f
            .lifecycle
            .rotate_refresh_token(p.uuid, &first.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidToken(TokenRejection::Revoked)
        ));

        // The rotated token is the one now accepted.
        assert!(f.lifecycle.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn new_sign_in_revokes_previous_refresh_token() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        let first = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();
        let _second = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();
        assert!(matches!(
            f.lifecycle.refresh(&first.refresh_token).await.unwrap_err(),
            AuthError::InvalidToken(TokenRejection::Revoked)
        ));
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        let pair = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();
        assert!(matches!(
            f.lifecycle.refresh(&pair.token).await.unwrap_err(),
            AuthError::InvalidToken(_)
        ));
    }

    #[tokio::test]
    async fn rotation_rejects_token_of_another_principal() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        let b = active_principal(&f, "b@x.com").await;
        let a_pair = f.lifecycle.sign_in("a@x.com", "pw123456").await.unwrap();
        assert!(matches!(
            f.lifecycle
                .rotate_refresh_token(b.uuid, &a_pair.refresh_token)
                .await
                .unwrap_err(),
            AuthError::InvalidToken(TokenRejection::UnknownPrincipal)
        ));
    }

    #[tokio::test]
    async fn recovery_for_unknown_email_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.lifecycle
                .send_recover_password_email("nobody@x.com")
                .await
                .unwrap_err(),
            AuthError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn reset_password_consumes_recover_token() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        assert!(f.lifecycle.send_recover_password_email("A@x.com").await.unwrap());
        let token = f
            .notifier
            .last_token("a@x.com", Template::RecoverPassword)
            .unwrap();

        f.lifecycle
            .reset_password(&token, "fresh-pass", "fresh-pass")
            .await
            .unwrap();
        assert!(f.lifecycle.sign_in("a@x.com", "fresh-pass").await.is_ok());
        assert!(f.lifecycle.sign_in("a@x.com", "pw123456").await.is_err());

        let err = f
            .lifecycle
            .reset_password(&token, "other-pass", "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_with_unknown_token_is_not_found() {
        let f = fixture();
        let err = f
            .lifecycle
            .reset_password("deadbeef", "fresh-pass", "fresh-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn mismatched_reset_keeps_old_password_and_token() {
        let f = fixture();
        active_principal(&f, "a@x.com").await;
        f.lifecycle.send_recover_password_email("a@x.com").await.unwrap();
        let token = f
            .notifier
            .last_token("a@x.com", Template::RecoverPassword)
            .unwrap();

        let err = f
            .lifecycle
            .reset_password(&token, "fresh-pass", "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(
            f.credentials
                .verify_credentials("a@x.com", "pw123456")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            f.credentials
                .store()
                .find_by_recover_token(&token)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn mismatched_change_keeps_old_password() {
        let f = fixture();
        let p = active_principal(&f, "a@x.com").await;
        let err = f
            .lifecycle
            .change_password(p.uuid, "fresh-pass", "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(
            f.credentials
                .verify_credentials("a@x.com", "pw123456")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn change_password_replaces_credentials() {
        let f = fixture();
        let p = active_principal(&f, "a@x.com").await;
        f.lifecycle
            .change_password(p.uuid, "fresh-pass", "fresh-pass")
            .await
            .unwrap();
        assert!(f.lifecycle.sign_in("a@x.com", "fresh-pass").await.is_ok());
        assert!(matches!(
            f.lifecycle
                .change_password(Uuid::new_v4(), "fresh-pass", "fresh-pass")
                .await
                .unwrap_err(),
            AuthError::NotFound(_)
        ));
    }
}
