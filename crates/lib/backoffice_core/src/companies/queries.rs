//! PostgreSQL-backed company store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::CompanyStore;
use crate::auth::AuthResult;
use crate::models::company::{Company, CompanyQuery};
use crate::pagination::{Pagination, contains_pattern};

type CompanyRow = (i64, Uuid, String, DateTime<Utc>, DateTime<Utc>);

fn company_from_row(row: CompanyRow) -> Company {
    let (id, uuid, name, created_at, updated_at) = row;
    Company {
        id,
        uuid,
        name,
        created_at,
        updated_at,
    }
}

/// `owner` restricts the result to one principal's companies.
fn push_company_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    owner: Option<i64>,
    query: &CompanyQuery,
) {
    if let Some(principal_id) = owner {
        qb.push(" JOIN principal_companies pc ON pc.company_id = c.id AND pc.principal_id = ")
            .push_bind(principal_id);
    }
    qb.push(" WHERE TRUE");
    if let Some(name) = &query.name {
        qb.push(" AND c.name ILIKE ")
            .push_bind(contains_pattern(name))
            .push(r" ESCAPE '\'");
    }
}

#[derive(Clone)]
pub struct PgCompanyStore {
    pool: PgPool,
}

impl PgCompanyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count and page queries sharing one filter.
    async fn fetch_page(
        &self,
        owner: Option<i64>,
        query: &CompanyQuery,
    ) -> AuthResult<(Vec<Company>, i64)> {
        let page = Pagination::new(query.page, query.limit);
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM companies c");
        push_company_filters(&mut count, owner, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.uuid, c.name, c.created_at, c.updated_at FROM companies c",
        );
        push_company_filters(&mut select, owner, query);
        select
            .push(" ORDER BY c.name, c.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select
            .build_query_as::<CompanyRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(company_from_row).collect(), total))
    }
}

#[async_trait]
impl CompanyStore for PgCompanyStore {
    async fn insert(&self, name: &str) -> AuthResult<Company> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "INSERT INTO companies (uuid, name) VALUES ($1, $2) \
             RETURNING id, uuid, name, created_at, updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(company_from_row(row))
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, uuid, name, created_at, updated_at FROM companies WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(company_from_row))
    }

    async fn list(&self, query: &CompanyQuery) -> AuthResult<(Vec<Company>, i64)> {
        self.fetch_page(None, query).await
    }

    async fn list_for_principal(
        &self,
        principal_id: i64,
        query: &CompanyQuery,
    ) -> AuthResult<(Vec<Company>, i64)> {
        self.fetch_page(Some(principal_id), query).await
    }

    async fn update_name(&self, uuid: Uuid, name: &str) -> AuthResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "UPDATE companies SET name = $2, updated_at = now() WHERE uuid = $1 \
             RETURNING id, uuid, name, created_at, updated_at",
        )
        .bind(uuid)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(company_from_row))
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        // Edges go with the company through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM companies WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_principal(&self, principal_id: i64, company_id: i64) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO principal_companies (principal_id, company_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(principal_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_linked(&self, principal_id: i64, company_uuid: Uuid) -> AuthResult<bool> {
        let linked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
               SELECT 1 FROM principal_companies pc \
               JOIN companies c ON c.id = pc.company_id \
               WHERE pc.principal_id = $1 AND c.uuid = $2)",
        )
        .bind(principal_id)
        .bind(company_uuid)
        .fetch_one(&self.pool)
        .await?;
        Ok(linked)
    }
}
