//! PostgreSQL-backed principal store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::PrincipalStore;
use super::{AuthError, AuthResult};
use crate::models::auth::{NewPrincipal, Principal, ProfileUpdate, UserQuery};
use crate::pagination::{Pagination, contains_pattern};

const COLUMNS: &str = "id, uuid, email, name, password_hash, salt, role, is_active, \
     confirmation_token, recover_token, current_hashed_refresh_token, created_at, updated_at";

/// Row as stored in the `principals` table.
#[derive(Debug, sqlx::FromRow)]
struct PrincipalRow {
    id: i64,
    uuid: Uuid,
    email: String,
    name: String,
    password_hash: String,
    salt: String,
    role: String,
    is_active: bool,
    confirmation_token: Option<String>,
    recover_token: Option<String>,
    current_hashed_refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PrincipalRow> for Principal {
    type Error = AuthError;

    fn try_from(row: PrincipalRow) -> Result<Self, Self::Error> {
        Ok(Principal {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            salt: row.salt,
            role: row.role.parse().map_err(AuthError::Internal)?,
            is_active: row.is_active,
            confirmation_token: row.confirmation_token,
            recover_token: row.recover_token,
            current_hashed_refresh_token: row.current_hashed_refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(row: Option<PrincipalRow>) -> AuthResult<Option<Principal>> {
    row.map(Principal::try_from).transpose()
}

/// Principal store over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where(&self, clause: &str, value: &str) -> AuthResult<Option<Principal>> {
        let sql = format!("SELECT {COLUMNS} FROM principals WHERE {clause} = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &query.name {
        qb.push(" AND name ILIKE ")
            .push_bind(contains_pattern(name))
            .push(r" ESCAPE '\'");
    }
    if let Some(email) = &query.email {
        qb.push(" AND email ILIKE ")
            .push_bind(contains_pattern(email))
            .push(r" ESCAPE '\'");
    }
    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(is_active) = query.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal> {
        let sql = format!(
            "INSERT INTO principals \
             (uuid, email, name, password_hash, salt, role, is_active, confirmation_token) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(&new.email)
            .bind(&new.name)
            .bind(&new.password_hash)
            .bind(&new.salt)
            .bind(new.role.as_str())
            .bind(&new.confirmation_token)
            .fetch_one(&self.pool)
            .await?;
        Principal::try_from(row)
    }

    async fn find_by_id(&self, id: i64) -> AuthResult<Option<Principal>> {
        let sql = format!("SELECT {COLUMNS} FROM principals WHERE id = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Principal>> {
        let sql = format!("SELECT {COLUMNS} FROM principals WHERE uuid = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        self.find_where("email", email).await
    }

    async fn find_by_recover_token(&self, token: &str) -> AuthResult<Option<Principal>> {
        self.find_where("recover_token", token).await
    }

    async fn redeem_confirmation_token(&self, token: &str) -> AuthResult<Option<Principal>> {
        let sql = format!(
            "UPDATE principals \
             SET confirmation_token = NULL, is_active = TRUE, updated_at = now() \
             WHERE confirmation_token = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }

    async fn set_recover_token(&self, id: i64, token: &str) -> AuthResult<()> {
        sqlx::query("UPDATE principals SET recover_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE principals \
             SET password_hash = $2, salt = $3, recover_token = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(salt)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reset_password_with_token(
        &self,
        token: &str,
        password_hash: &str,
        salt: &str,
    ) -> AuthResult<Option<Principal>> {
        let sql = format!(
            "UPDATE principals \
             SET password_hash = $2, salt = $3, recover_token = NULL, updated_at = now() \
             WHERE recover_token = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(token)
            .bind(password_hash)
            .bind(salt)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }

    async fn set_refresh_token_hash(&self, id: i64, hash: Option<&str>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE principals SET current_hashed_refresh_token = $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn swap_refresh_token_hash(
        &self,
        id: i64,
        expected: &str,
        new: &str,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE principals SET current_hashed_refresh_token = $3, updated_at = now() \
             WHERE id = $1 AND current_hashed_refresh_token = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &ProfileUpdate,
    ) -> AuthResult<Option<Principal>> {
        let sql = format!(
            "UPDATE principals SET \
               name = COALESCE($2, name), \
               email = COALESCE($3, email), \
               role = COALESCE($4, role), \
               is_active = COALESCE($5, is_active), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.email.as_deref())
            .bind(update.role.map(|r| r.as_str()))
            .bind(update.is_active)
            .fetch_optional(&self.pool)
            .await?;
        convert(row)
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM principals WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &UserQuery) -> AuthResult<(Vec<Principal>, i64)> {
        let page = Pagination::new(query.page, query.limit);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM principals");
        push_user_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM principals"));
        push_user_filters(&mut select, query);
        select
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select
            .build_query_as::<PrincipalRow>()
            .fetch_all(&self.pool)
            .await?;

        let principals = rows
            .into_iter()
            .map(Principal::try_from)
            .collect::<AuthResult<Vec<_>>>()?;
        Ok((principals, total))
    }
}
