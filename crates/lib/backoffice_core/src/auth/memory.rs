//! In-memory principal store, used by tests and by the server's `--memory` mode.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::PrincipalStore;
use super::{AuthError, AuthResult};
use crate::models::auth::{NewPrincipal, Principal, ProfileUpdate, UserQuery};
use crate::pagination::{Pagination, contains_ci};

#[derive(Default)]
struct State {
    principals: BTreeMap<i64, Principal>,
    next_id: i64,
}

impl State {
    fn find_mut(&mut self, pred: impl Fn(&Principal) -> bool) -> Option<&mut Principal> {
        self.principals.values_mut().find(|p| pred(p))
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.principals
            .values()
            .any(|p| p.email == email && Some(p.id) != except)
    }
}

/// Principal store backed by a map behind an async `RwLock`.
///
/// Every conditional update runs under the write lock, which gives the same
/// single-redemption guarantee as the SQL `UPDATE ... WHERE token = $1`.
#[derive(Default)]
pub struct InMemoryPrincipalStore {
    state: RwLock<State>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_query(p: &Principal, query: &UserQuery) -> bool {
    query.name.as_deref().is_none_or(|n| contains_ci(&p.name, n))
        && query.email.as_deref().is_none_or(|e| contains_ci(&p.email, e))
        && query.role.is_none_or(|r| p.role == r)
        && query.is_active.is_none_or(|a| p.is_active == a)
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal> {
        let mut state = self.state.write().await;
        if state.email_taken(&new.email, None) {
            return Err(AuthError::Conflict("Email address already registered".into()));
        }
        state.next_id += 1;
        let now = Utc::now();
        let principal = Principal {
            id: state.next_id,
            uuid: Uuid::now_v7(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            salt: new.salt,
            role: new.role,
            is_active: false,
            confirmation_token: Some(new.confirmation_token),
            recover_token: None,
            current_hashed_refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        state.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn find_by_id(&self, id: i64) -> AuthResult<Option<Principal>> {
        Ok(self.state.read().await.principals.get(&id).cloned())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Principal>> {
        let state = self.state.read().await;
        Ok(state.principals.values().find(|p| p.uuid == uuid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        let state = self.state.read().await;
        Ok(state.principals.values().find(|p| p.email == email).cloned())
    }

    async fn find_by_recover_token(&self, token: &str) -> AuthResult<Option<Principal>> {
        let state = self.state.read().await;
        Ok(state
            .principals
            .values()
            .find(|p| p.recover_token.as_deref() == Some(token))
            .cloned())
    }

    async fn redeem_confirmation_token(&self, token: &str) -> AuthResult<Option<Principal>> {
        let mut state = self.state.write().await;
        Ok(state
            .find_mut(|p| p.confirmation_token.as_deref() == Some(token))
            .map(|p| {
                p.confirmation_token = None;
                p.is_active = true;
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn set_recover_token(&self, id: i64, token: &str) -> AuthResult<()> {
        let mut state = self.state.write().await;
        if let Some(p) = state.principals.get_mut(&id) {
            p.recover_token = Some(token.to_string());
            p.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> AuthResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.principals.get_mut(&id) {
            Some(p) => {
                p.password_hash = password_hash.to_string();
                p.salt = salt.to_string();
                p.recover_token = None;
                p.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn reset_password_with_token(
        &self,
        token: &str,
        password_hash: &str,
        salt: &str,
    ) -> AuthResult<Option<Principal>> {
        let mut state = self.state.write().await;
        Ok(state
            .find_mut(|p| p.recover_token.as_deref() == Some(token))
            .map(|p| {
                p.password_hash = password_hash.to_string();
                p.salt = salt.to_string();
                p.recover_token = None;
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> AuthResult<()> {
        let mut state = self.state.write().await;
        if let Some(p) = state.principals.get_mut(&id) {
            p.current_hashed_refresh_token = hash.map(str::to_string);
            p.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn swap_refresh_token_hash(
        &self,
        id: i64,
        expected: &str,
        new: &str,
    ) -> AuthResult<bool> {
        let mut state = self.state.write().await;
        match state.principals.get_mut(&id) {
            Some(p) if p.current_hashed_refresh_token.as_deref() == Some(expected) => {
                p.current_hashed_refresh_token = Some(new.to_string());
                p.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate,
    ) -> AuthResult<Option<Principal>> {
        let mut state = self.state.write().await;
        if let Some(email) = &update.email
            && state.email_taken(email, Some(id))
        {
            return Err(AuthError::Conflict("Email address already registered".into()));
        }
        Ok(state.principals.get_mut(&id).map(|p| {
            if let Some(name) = &update.name {
                p.name = name.clone();
            }
            if let Some(email) = &update.email {
                p.email = email.clone();
            }
            if let Some(role) = update.role {
                p.role = role;
            }
            if let Some(is_active) = update.is_active {
                p.is_active = is_active;
            }
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        let mut state = self.state.write().await;
        let before = state.principals.len();
        state.principals.retain(|_, p| p.uuid != uuid);
        Ok(state.principals.len() < before)
    }

    async fn list(&self, query: &UserQuery) -> AuthResult<(Vec<Principal>, i64)> {
        let state = self.state.read().await;
        let matching: Vec<Principal> = state
            .principals
            .values()
            .filter(|p| matches_query(p, query))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok((Pagination::new(query.page, query.limit).apply(matching), total))
    }
}
